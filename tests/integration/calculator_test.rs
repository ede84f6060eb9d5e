// Allocation calculator properties across a spread of inputs

use inferguard::core::allocation::{
    calculate, MemoryPressure, QuantizationLevel, SystemMetrics, ThermalState, ThrottleLevel,
    MAX_CONTEXT_LENGTH, MIN_CONTEXT_LENGTH,
};
use inferguard::core::config::{AggressivenessLevel, Configuration};

use super::support::{reference_config, GB};

const THERMAL: [ThermalState; 4] = [
    ThermalState::Nominal,
    ThermalState::Fair,
    ThermalState::Serious,
    ThermalState::Critical,
];

const PRESSURE: [MemoryPressure; 3] = [
    MemoryPressure::Nominal,
    MemoryPressure::Warning,
    MemoryPressure::Critical,
];

fn snapshots() -> Vec<SystemMetrics> {
    let mut out = Vec::new();
    for (total, available) in [(0, 0), (4, 1), (16, 8), (64, 60), (512, 500), (16, 32)] {
        for thermal in THERMAL {
            for pressure in PRESSURE {
                for (battery, charging) in [(1.0, true), (0.1, false), (0.6, false)] {
                    out.push(SystemMetrics {
                        total_memory_bytes: total * GB,
                        available_memory_bytes: available * GB,
                        thermal_state: thermal,
                        memory_pressure: pressure,
                        battery_level: battery,
                        is_charging: charging,
                        ..Default::default()
                    });
                }
            }
        }
    }
    out
}

fn configs() -> Vec<Configuration> {
    vec![
        Configuration::default(),
        reference_config(),
        Configuration {
            aggressiveness_level: AggressivenessLevel::Aggressive,
            max_model_memory_percent: 1.0,
            reserve_system_memory_gb: 0.0,
            ..Default::default()
        },
        Configuration {
            aggressiveness_level: AggressivenessLevel::Conservative,
            min_model_memory_percent: 0.3,
            kv_cache_memory_percent: 1.0,
            ..Default::default()
        },
    ]
}

#[test]
fn test_floor_not_truncated() {
    // 0.1 of 16 GiB is 1717986918.4 bytes
    let metrics = SystemMetrics {
        total_memory_bytes: 16 * GB,
        available_memory_bytes: GB,
        ..Default::default()
    };
    let allocation = calculate(&metrics, &Configuration::default());
    assert_eq!(allocation.max_model_memory_bytes, 1_717_986_919);
}

#[test]
fn test_floor_never_violated() {
    for config in configs() {
        for metrics in snapshots() {
            let allocation = calculate(&metrics, &config);
            let floor = metrics.total_memory_bytes as f64 * config.min_model_memory_percent;
            assert!(
                allocation.max_model_memory_bytes as f64 >= floor,
                "budget {} below floor {} for {:?}",
                allocation.max_model_memory_bytes,
                floor,
                metrics
            );
        }
    }
}

#[test]
fn test_kv_cache_within_budget_and_context_in_range() {
    for config in configs() {
        for metrics in snapshots() {
            let allocation = calculate(&metrics, &config);
            assert!(allocation.kv_cache_size_bytes <= allocation.max_model_memory_bytes);
            assert!(allocation.recommended_context_length >= MIN_CONTEXT_LENGTH);
            assert!(allocation.recommended_context_length <= MAX_CONTEXT_LENGTH);
            assert!(allocation.recommended_batch_size >= 1);
            assert_ne!(allocation.quantization_level, QuantizationLevel::Fp32);
        }
    }
}

#[test]
fn test_critical_thermal_disables_acceleration() {
    let config = Configuration {
        enable_gpu_offload: true,
        enable_neural_engine_optimization: true,
        ..Default::default()
    };

    for metrics in snapshots()
        .into_iter()
        .filter(|m| m.thermal_state == ThermalState::Critical)
    {
        let allocation = calculate(&metrics, &config);
        assert!(!allocation.use_gpu_acceleration);
        assert!(!allocation.use_neural_engine);
        assert_eq!(allocation.recommended_batch_size, 1);
    }
}

#[test]
fn test_acceleration_follows_configuration() {
    let metrics = SystemMetrics {
        total_memory_bytes: 32 * GB,
        available_memory_bytes: 24 * GB,
        ..Default::default()
    };

    let allocation = calculate(&metrics, &Configuration::default());
    assert!(allocation.use_gpu_acceleration);
    assert!(allocation.use_neural_engine);

    let config = Configuration {
        enable_gpu_offload: false,
        enable_neural_engine_optimization: false,
        ..Default::default()
    };
    let allocation = calculate(&metrics, &config);
    assert!(!allocation.use_gpu_acceleration);
    assert!(!allocation.use_neural_engine);
}

#[test]
fn test_precision_never_rises_as_memory_shrinks() {
    let config = Configuration {
        reserve_system_memory_gb: 0.0,
        min_model_memory_percent: 0.0,
        ..Default::default()
    };

    let mut previous = QuantizationLevel::Fp32;
    for available_gb in (0..=128).rev() {
        let metrics = SystemMetrics {
            total_memory_bytes: 128 * GB,
            available_memory_bytes: available_gb * GB,
            ..Default::default()
        };
        let level = calculate(&metrics, &config).quantization_level;
        assert!(level <= previous, "precision rose at {} GB available", available_gb);
        previous = level;
    }
    assert_eq!(previous, QuantizationLevel::Q2);
}

#[test]
fn test_reference_scenario() {
    let metrics = SystemMetrics {
        total_memory_bytes: 16 * GB,
        available_memory_bytes: 8 * GB,
        ..Default::default()
    };

    let allocation = calculate(&metrics, &reference_config());

    // (8GB - 2GB reserve) * 0.5
    assert_eq!(allocation.max_model_memory_bytes, 3 * GB);
    // 3GB sits in the [2, 8) GB band
    assert_eq!(allocation.quantization_level, QuantizationLevel::Q4);
    assert_eq!(allocation.throttle_level, ThrottleLevel::None);
}

#[test]
fn test_worst_case_scenario() {
    let metrics = SystemMetrics {
        total_memory_bytes: 16 * GB,
        available_memory_bytes: 8 * GB,
        thermal_state: ThermalState::Critical,
        memory_pressure: MemoryPressure::Critical,
        battery_level: 0.1,
        is_charging: false,
        ..Default::default()
    };

    let allocation = calculate(&metrics, &Configuration::default());
    assert_eq!(allocation.throttle_level, ThrottleLevel::Severe);
    assert_eq!(allocation.recommended_batch_size, 1);
}

#[test]
fn test_throughput_is_advisory_only() {
    let metrics = SystemMetrics {
        total_memory_bytes: 16 * GB,
        available_memory_bytes: 8 * GB,
        ..Default::default()
    };

    let with_gpu = calculate(&metrics, &Configuration::default());
    let without_gpu = calculate(
        &metrics,
        &Configuration {
            enable_gpu_offload: false,
            enable_neural_engine_optimization: false,
            ..Default::default()
        },
    );

    assert!(with_gpu.effective_tokens_per_second > without_gpu.effective_tokens_per_second);
    assert_eq!(with_gpu.max_model_memory_bytes, without_gpu.max_model_memory_bytes);
    assert_eq!(with_gpu.quantization_level, without_gpu.quantization_level);
}
