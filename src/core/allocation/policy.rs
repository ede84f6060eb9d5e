//! Hysteresis between the current and a freshly computed allocation.

use super::metrics::{MemoryPressure, SystemMetrics, ThermalState};
use super::types::ResourceAllocation;

/// Relative memory-budget change that must be exceeded before a new
/// allocation replaces the current one
pub const MEMORY_CHANGE_THRESHOLD: f64 = 0.10;

pub const ROUTINE_REASON: &str = "Routine optimization";

/// Whether `new` differs enough from `old` to be applied
pub fn should_adjust(old: &ResourceAllocation, new: &ResourceAllocation) -> bool {
    if old.throttle_level != new.throttle_level {
        return true;
    }

    if old.quantization_level != new.quantization_level {
        return true;
    }

    memory_change_ratio(old.max_model_memory_bytes, new.max_model_memory_bytes)
        > MEMORY_CHANGE_THRESHOLD
}

/// `|new - old| / old`; any change away from a zero budget counts as infinite
pub fn memory_change_ratio(old: u64, new: u64) -> f64 {
    if old == 0 {
        return if new == 0 { 0.0 } else { f64::INFINITY };
    }
    old.abs_diff(new) as f64 / old as f64
}

/// Describe which signals are off-nominal
pub fn generate_reason(metrics: &SystemMetrics) -> String {
    let mut parts = Vec::new();

    if metrics.thermal_state != ThermalState::Nominal {
        parts.push(format!("thermal state: {}", metrics.thermal_state));
    }

    if metrics.memory_pressure != MemoryPressure::Nominal {
        parts.push(format!("memory pressure: {}", metrics.memory_pressure));
    }

    if metrics.is_battery_low() {
        parts.push(format!(
            "battery: {:.0}%",
            metrics.battery_level.clamp(0.0, 1.0) * 100.0
        ));
    }

    if parts.is_empty() {
        ROUTINE_REASON.to_string()
    } else {
        parts.join(", ")
    }
}
