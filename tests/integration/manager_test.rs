// ResourceManager: evaluation pipeline, queries and configuration updates

use std::sync::Arc;
use std::thread;

use inferguard::core::allocation::{
    MemoryPressure, RecommendationAction, ThermalState, ThrottleLevel, CONFIGURATION_REASON,
    DEFAULT_HISTORY_SIZE, ROUTINE_REASON,
};
use inferguard::core::config::{Configuration, InMemoryConfigStore};
use inferguard::ResourceManager;

use super::support::{manager_with, reference_config, MockMetricsProvider, GB};

#[test]
fn test_history_capped_at_capacity() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(provider.clone(), reference_config());

    // Alternate throttle levels so every pass is accepted
    for i in 0..(DEFAULT_HISTORY_SIZE + 5) {
        let state = if i % 2 == 0 {
            ThermalState::Fair
        } else {
            ThermalState::Nominal
        };
        provider.update(|m| m.thermal_state = state);
        assert!(manager.evaluate_now().is_some());
    }

    let history = manager.history();
    assert_eq!(history.len(), DEFAULT_HISTORY_SIZE);
    // Passes 0..=4 evicted; pass 5 returned to nominal
    assert_eq!(history[0].reason, ROUTINE_REASON);
    assert_eq!(history[DEFAULT_HISTORY_SIZE - 1].reason, "thermal state: fair");
}

#[test]
fn test_routine_reason_when_signals_nominal() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(provider.clone(), reference_config());

    // Plenty of memory frees up: budget jumps well past 10%
    provider.update(|m| m.available_memory_bytes = 14 * GB);
    let change = manager.evaluate_now().expect("large change should apply");
    assert_eq!(change.reason, ROUTINE_REASON);
    assert_eq!(change.allocation.max_model_memory_bytes, 6 * GB);
}

#[test]
fn test_update_configuration_persists_and_recomputes() {
    let provider = MockMetricsProvider::new(16, 8);
    let store = Arc::new(InMemoryConfigStore::new());
    let manager = ResourceManager::with_configuration(provider, store.clone(), reference_config());
    let mut changes = manager.subscribe();

    let config = Configuration {
        enable_gpu_offload: false,
        ..reference_config()
    };
    let change = manager
        .update_configuration(config.clone())
        .expect("flag change should apply");

    assert_eq!(change.reason, CONFIGURATION_REASON);
    assert!(!change.allocation.use_gpu_acceleration);
    assert!(!manager.current_allocation().use_gpu_acceleration);
    assert_eq!(store.stored(), Some(config.clone()));
    assert_eq!(store.save_count(), 1);
    assert_eq!(*manager.configuration(), config);
    assert_eq!(changes.try_recv().unwrap(), change);
}

#[test]
fn test_update_configuration_is_sanitized() {
    let manager = manager_with(MockMetricsProvider::new(16, 8), reference_config());

    manager.update_configuration(Configuration {
        max_model_memory_percent: 4.0,
        update_interval_seconds: -1.0,
        ..reference_config()
    });

    let config = manager.configuration();
    assert_eq!(config.max_model_memory_percent, 1.0);
    assert!(config.update_interval_seconds > 0.0);
}

#[test]
fn test_identical_configuration_records_nothing() {
    let manager = manager_with(MockMetricsProvider::new(16, 8), reference_config());
    assert!(manager.update_configuration(reference_config()).is_none());
    assert!(manager.history().is_empty());
}

#[test]
fn test_stored_configuration_loaded() {
    let store = Arc::new(InMemoryConfigStore::with_config(reference_config()));
    let manager = ResourceManager::new(MockMetricsProvider::new(16, 8), store);

    assert_eq!(*manager.configuration(), reference_config());
    assert_eq!(manager.current_allocation().max_model_memory_bytes, 3 * GB);
}

#[test]
fn test_model_queries_follow_current_allocation() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(provider.clone(), reference_config());

    assert!(manager.can_load_model(2.5));
    assert!(!manager.can_load_model(4.0));

    let settings = manager.get_settings_for_model(2.5);
    assert!(settings.fits_in_budget);

    let settings = manager.get_settings_for_model(4.0);
    assert!(!settings.fits_in_budget);
    assert!(settings.quantization <= manager.current_allocation().quantization_level);
}

#[test]
fn test_recommendations_use_latest_snapshot() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(provider.clone(), reference_config());

    provider.update(|m| {
        m.thermal_state = ThermalState::Serious;
        m.memory_pressure = MemoryPressure::Warning;
    });
    manager.evaluate_now();

    assert_eq!(manager.current_allocation().throttle_level, ThrottleLevel::Heavy);

    let actions: Vec<_> = manager
        .recommendations()
        .into_iter()
        .map(|r| r.action)
        .collect();
    assert_eq!(
        actions,
        vec![RecommendationAction::CoolDown, RecommendationAction::FreeMemory]
    );
}

#[test]
fn test_concurrent_evaluations_keep_history_chained() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .build()
        .unwrap();
    let _guard = runtime.enter();

    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(
        provider.clone(),
        Configuration {
            update_interval_seconds: 0.1,
            ..reference_config()
        },
    );
    manager.start_monitoring().unwrap();

    thread::scope(|scope| {
        for worker in 0..2 {
            let provider = provider.clone();
            let manager = manager.clone();
            scope.spawn(move || {
                for i in 0..40 {
                    let state = if (i + worker) % 2 == 0 {
                        ThermalState::Serious
                    } else {
                        ThermalState::Nominal
                    };
                    provider.update(|m| {
                        m.thermal_state = state;
                        m.memory_pressure = if i % 3 == 0 {
                            MemoryPressure::Warning
                        } else {
                            MemoryPressure::Nominal
                        };
                    });
                    manager.evaluate_now();
                }
            });
        }

        let config_manager = manager.clone();
        scope.spawn(move || {
            for i in 0..20 {
                config_manager.update_configuration(Configuration {
                    enable_gpu_offload: i % 2 == 0,
                    ..reference_config()
                });
            }
        });

        let pressure_manager = manager.clone();
        scope.spawn(move || {
            for _ in 0..20 {
                pressure_manager.notify_memory_pressure(MemoryPressure::Critical);
                thread::yield_now();
            }
        });
    });

    manager.stop_monitoring();

    let history = manager.history();
    assert!(history.len() >= 20);
    assert!(history.iter().any(|entry| entry.is_emergency()));
    for pair in history.windows(2) {
        assert_eq!(pair[1].previous, pair[0].new);
    }
    assert_eq!(manager.current_allocation(), history[history.len() - 1].new);
}
