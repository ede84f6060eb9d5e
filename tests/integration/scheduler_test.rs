// Monitoring lifecycle and event routing, on a paused clock

use tokio::time::{sleep, Duration};

use inferguard::core::allocation::{
    MemoryPressure, QuantizationLevel, ThermalState, EMERGENCY_REASON,
};
use inferguard::core::config::Configuration;

use super::support::{manager_with, reference_config, MockMetricsProvider, GB};

#[tokio::test(start_paused = true)]
async fn test_ticks_once_per_interval() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(provider.clone(), reference_config());
    let baseline = provider.collect_count();

    manager.start_monitoring().unwrap();
    // Second start is a no-op, not a second loop
    manager.start_monitoring().unwrap();
    assert!(manager.is_monitoring());

    sleep(Duration::from_millis(10_500)).await;

    assert_eq!(provider.collect_count() - baseline, 10);
    manager.stop_monitoring();
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_evaluation() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(provider.clone(), reference_config());

    manager.start_monitoring().unwrap();
    sleep(Duration::from_millis(3_500)).await;
    manager.stop_monitoring();

    let stopped_at = provider.collect_count();
    assert!(!manager.is_monitoring());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(provider.collect_count(), stopped_at);

    // Stopping twice is harmless
    manager.stop_monitoring();
    assert!(!manager.is_monitoring());
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(provider.clone(), reference_config());

    manager.start_monitoring().unwrap();
    manager.stop_monitoring();
    manager.start_monitoring().unwrap();

    let before = provider.collect_count();
    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(provider.collect_count() - before, 2);
    manager.stop_monitoring();
}

#[tokio::test(start_paused = true)]
async fn test_thermal_event_triggers_evaluation() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(
        provider.clone(),
        Configuration {
            update_interval_seconds: 60.0,
            ..reference_config()
        },
    );

    manager.start_monitoring().unwrap();
    provider.update(|m| m.thermal_state = ThermalState::Serious);
    manager.notify_thermal_state(ThermalState::Serious);

    sleep(Duration::from_millis(100)).await;

    let history = manager.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reason, "thermal state: serious");
    manager.stop_monitoring();
}

#[tokio::test(start_paused = true)]
async fn test_critical_pressure_reduces_before_returning() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(
        provider.clone(),
        Configuration {
            update_interval_seconds: 60.0,
            ..reference_config()
        },
    );
    let mut changes = manager.subscribe();

    manager.start_monitoring().unwrap();
    provider.update(|m| m.memory_pressure = MemoryPressure::Critical);
    manager.notify_memory_pressure(MemoryPressure::Critical);

    // No await yet: the monitor task has not run
    let current = manager.current_allocation();
    assert_eq!(current.max_model_memory_bytes, 3 * GB / 2);
    assert_eq!(current.quantization_level, QuantizationLevel::Q4);
    assert!(current.recommended_context_length <= 2048);

    let first = changes.try_recv().unwrap();
    assert!(first.emergency);
    assert_eq!(first.reason, EMERGENCY_REASON);
    assert_eq!(
        manager.history()[0].metrics_at_change.memory_pressure,
        MemoryPressure::Critical
    );

    // The queued event is then evaluated against the reduced allocation
    sleep(Duration::from_millis(100)).await;
    let history = manager.history();
    assert_eq!(history.len(), 2);
    assert!(history[0].is_emergency());
    assert_eq!(history[1].previous, current);
    assert_eq!(history[1].reason, "memory pressure: critical");
    manager.stop_monitoring();
}

#[tokio::test(start_paused = true)]
async fn test_events_ignored_while_stopped() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(provider.clone(), reference_config());
    let before = manager.current_allocation();

    manager.notify_thermal_state(ThermalState::Critical);
    manager.notify_memory_pressure(MemoryPressure::Critical);
    sleep(Duration::from_secs(5)).await;

    assert_eq!(manager.current_allocation(), before);
    assert!(manager.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_longer_interval_restarts_ticker() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(provider.clone(), reference_config());

    manager.start_monitoring().unwrap();
    sleep(Duration::from_millis(500)).await;

    manager.update_configuration(Configuration {
        update_interval_seconds: 5.0,
        ..reference_config()
    });
    let after_update = provider.collect_count();

    // The 1s tick is dropped; next tick 5s after the update
    sleep(Duration::from_millis(4_750)).await;
    assert_eq!(provider.collect_count(), after_update);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(provider.collect_count() - after_update, 1);
    manager.stop_monitoring();
}

#[tokio::test(start_paused = true)]
async fn test_shorter_interval_applies_without_waiting() {
    let provider = MockMetricsProvider::new(16, 8);
    let manager = manager_with(
        provider.clone(),
        Configuration {
            update_interval_seconds: 60.0,
            ..reference_config()
        },
    );

    manager.start_monitoring().unwrap();
    sleep(Duration::from_millis(500)).await;

    manager.update_configuration(reference_config());
    let after_update = provider.collect_count();

    sleep(Duration::from_millis(3_250)).await;
    assert_eq!(provider.collect_count() - after_update, 3);
    manager.stop_monitoring();
}

#[tokio::test(start_paused = true)]
async fn test_signal_watcher_emits_events() {
    let provider = MockMetricsProvider::with_signals(16, 8);
    let manager = manager_with(
        provider.clone(),
        Configuration {
            update_interval_seconds: 60.0,
            ..reference_config()
        },
    );

    manager.start_monitoring().unwrap();
    // Let the watcher take its baseline reading
    sleep(Duration::from_millis(100)).await;

    provider.update(|m| m.thermal_state = ThermalState::Fair);
    sleep(Duration::from_millis(1_500)).await;

    let history = manager.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reason, "thermal state: fair");
    manager.stop_monitoring();
}

#[test]
fn test_start_requires_runtime() {
    let manager = manager_with(MockMetricsProvider::new(16, 8), reference_config());
    assert!(manager.start_monitoring().is_err());
    assert!(!manager.is_monitoring());
}
