//! Allocation calculator.
//!
//! Pure mapping from a metrics snapshot and a configuration to a resource
//! budget. Total: every input, however extreme, yields a clamped allocation.

use super::metrics::{MemoryPressure, SystemMetrics, ThermalState};
use super::types::*;
use crate::core::config::Configuration;

const GPU_SPEEDUP: f64 = 1.5;
const NEURAL_ENGINE_SPEEDUP: f64 = 1.3;
const MIN_BATTERY_MULTIPLIER: f64 = 0.5;

/// Compute the optimal allocation for the given snapshot
pub fn calculate(metrics: &SystemMetrics, config: &Configuration) -> ResourceAllocation {
    let effective_available = effective_available_memory(metrics, config) as f64;

    let multiplier = thermal_multiplier(metrics.thermal_state)
        * pressure_multiplier(metrics.memory_pressure)
        * battery_multiplier(metrics, config)
        * config.aggressiveness_level.memory_multiplier();

    let budget = effective_available * config.max_model_memory_percent * multiplier;
    let floor = metrics.total_memory_bytes as f64 * config.min_model_memory_percent;
    // Rounded up: truncation could land below the floor
    let max_model_memory_bytes = budget.max(floor).max(0.0).ceil() as u64;

    let kv_cache_size_bytes = ((max_model_memory_bytes as f64
        * config.kv_cache_memory_percent.clamp(0.0, 1.0)) as u64)
        .min(max_model_memory_bytes);

    let memory_gb = max_model_memory_bytes as f64 / BYTES_PER_GB as f64;
    let quantization_level = select_quantization(memory_gb);
    let recommended_context_length = context_length(kv_cache_size_bytes, quantization_level);
    let recommended_batch_size = batch_size(memory_gb, metrics.thermal_state);
    let throttle_level = throttle_level(metrics);

    let accelerators_allowed = metrics.thermal_state != ThermalState::Critical;
    let use_gpu_acceleration = config.enable_gpu_offload && accelerators_allowed;
    let use_neural_engine = config.enable_neural_engine_optimization && accelerators_allowed;

    let effective_tokens_per_second = estimate_tokens_per_second(
        quantization_level,
        throttle_level,
        use_gpu_acceleration,
        use_neural_engine,
    );

    ResourceAllocation {
        max_model_memory_bytes,
        kv_cache_size_bytes,
        quantization_level,
        recommended_context_length,
        recommended_batch_size,
        throttle_level,
        use_gpu_acceleration,
        use_neural_engine,
        effective_tokens_per_second,
    }
}

/// Available memory minus the system reserve, or half of it when the reserve
/// would consume everything
pub fn effective_available_memory(metrics: &SystemMetrics, config: &Configuration) -> u64 {
    let available = metrics.available_memory_bytes;
    let reserve = config.reserve_bytes();

    if available > reserve {
        available - reserve
    } else {
        available / 2
    }
}

pub fn thermal_multiplier(state: ThermalState) -> f64 {
    match state {
        ThermalState::Nominal => 1.0,
        ThermalState::Fair => 0.85,
        ThermalState::Serious => 0.6,
        ThermalState::Critical => 0.3,
    }
}

pub fn pressure_multiplier(pressure: MemoryPressure) -> f64 {
    match pressure {
        MemoryPressure::Nominal => 1.0,
        MemoryPressure::Warning => 0.7,
        MemoryPressure::Critical => 0.4,
    }
}

pub fn battery_multiplier(metrics: &SystemMetrics, config: &Configuration) -> f64 {
    if config.enable_battery_awareness && !metrics.is_charging {
        metrics
            .battery_level
            .clamp(0.0, 1.0)
            .max(MIN_BATTERY_MULTIPLIER)
    } else {
        1.0
    }
}

/// Pick weight precision from the model budget. fp32 is never selected.
pub fn select_quantization(memory_gb: f64) -> QuantizationLevel {
    if memory_gb < 2.0 {
        QuantizationLevel::Q2
    } else if memory_gb < 8.0 {
        QuantizationLevel::Q4
    } else if memory_gb < 16.0 {
        QuantizationLevel::Q8
    } else {
        QuantizationLevel::Fp16
    }
}

/// Tokens that fit in the KV cache, clamped to the supported range
pub fn context_length(kv_cache_bytes: u64, quantization: QuantizationLevel) -> u32 {
    let per_token = quantization.kv_bytes_per_token().max(1);
    clamp_context_length(kv_cache_bytes / per_token)
}

pub fn batch_size(memory_gb: f64, thermal: ThermalState) -> u32 {
    let base = if memory_gb < 4.0 {
        1
    } else if memory_gb < 8.0 {
        2
    } else if memory_gb < 16.0 {
        4
    } else if memory_gb < 32.0 {
        8
    } else {
        16
    };

    match thermal {
        ThermalState::Critical => 1,
        ThermalState::Serious => (base / 2).max(1),
        _ => base,
    }
}

/// Additive constraint score bucketed into a throttle tier
pub fn throttle_level(metrics: &SystemMetrics) -> ThrottleLevel {
    let thermal_score = match metrics.thermal_state {
        ThermalState::Nominal => 0,
        ThermalState::Fair => 1,
        ThermalState::Serious => 2,
        ThermalState::Critical => 4,
    };

    let pressure_score = match metrics.memory_pressure {
        MemoryPressure::Nominal => 0,
        MemoryPressure::Warning => 1,
        MemoryPressure::Critical => 2,
    };

    let battery_score = if metrics.is_battery_low() { 2 } else { 0 };

    ThrottleLevel::from_score(thermal_score + pressure_score + battery_score)
}

pub fn estimate_tokens_per_second(
    quantization: QuantizationLevel,
    throttle: ThrottleLevel,
    use_gpu: bool,
    use_neural_engine: bool,
) -> f64 {
    let mut rate = quantization.base_tokens_per_second() * throttle.speed_factor();
    if use_gpu {
        rate *= GPU_SPEEDUP;
    }
    if use_neural_engine {
        rate *= NEURAL_ENGINE_SPEEDUP;
    }
    rate
}
