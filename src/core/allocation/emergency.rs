//! Fast reaction to critical memory pressure.
//!
//! Works from the current allocation instead of recalculating, so it needs no
//! fresh metrics and never waits on a probe.

use super::calculator::{context_length, estimate_tokens_per_second};
use super::types::{QuantizationLevel, ResourceAllocation};

pub const EMERGENCY_REASON: &str = "Emergency: Critical memory pressure";
pub const EMERGENCY_CONTEXT_CAP: u32 = 2048;

/// Halve the memory budget and KV cache, cap the context and force q4
pub fn emergency_allocation(current: &ResourceAllocation) -> ResourceAllocation {
    let max_model_memory_bytes = current.max_model_memory_bytes / 2;
    let kv_cache_size_bytes = (current.kv_cache_size_bytes / 2).min(max_model_memory_bytes);
    let quantization_level = QuantizationLevel::Q4;

    // Never exceed what the halved cache can hold, nor the emergency cap
    let recommended_context_length = current
        .recommended_context_length
        .min(EMERGENCY_CONTEXT_CAP)
        .min(context_length(kv_cache_size_bytes, quantization_level));

    ResourceAllocation {
        max_model_memory_bytes,
        kv_cache_size_bytes,
        quantization_level,
        recommended_context_length,
        effective_tokens_per_second: estimate_tokens_per_second(
            quantization_level,
            current.throttle_level,
            current.use_gpu_acceleration,
            current.use_neural_engine,
        ),
        ..current.clone()
    }
}
