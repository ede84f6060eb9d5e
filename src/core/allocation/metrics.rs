use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Device temperature tier, ordered from coolest to hottest
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ThermalState {
    #[default]
    Nominal,
    Fair,
    Serious,
    Critical,
}

impl fmt::Display for ThermalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThermalState::Nominal => "nominal",
            ThermalState::Fair => "fair",
            ThermalState::Serious => "serious",
            ThermalState::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// OS-reported memory scarcity tier
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressure {
    #[default]
    Nominal,
    Warning,
    Critical,
}

impl fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryPressure::Nominal => "nominal",
            MemoryPressure::Warning => "warning",
            MemoryPressure::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Complete hardware snapshot consumed by one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct SystemMetrics {
    pub total_memory_bytes: u64,
    pub available_memory_bytes: u64,
    pub thermal_state: ThermalState,
    pub memory_pressure: MemoryPressure,
    pub cpu_usage_percent: f64, // 0-100
    pub gpu_usage_percent: f64, // 0-100
    pub gpu_memory_used_bytes: u64,
    pub gpu_memory_total_bytes: u64,
    pub battery_level: f64, // 0-1
    pub is_charging: bool,
    pub timestamp: Instant,
}

impl Default for SystemMetrics {
    /// Empty snapshot with the documented probe fallbacks: no GPU, plugged in.
    fn default() -> Self {
        Self {
            total_memory_bytes: 0,
            available_memory_bytes: 0,
            thermal_state: ThermalState::Nominal,
            memory_pressure: MemoryPressure::Nominal,
            cpu_usage_percent: 0.0,
            gpu_usage_percent: 0.0,
            gpu_memory_used_bytes: 0,
            gpu_memory_total_bytes: 0,
            battery_level: 1.0,
            is_charging: true,
            timestamp: Instant::now(),
        }
    }
}

impl SystemMetrics {
    /// Battery is considered low below 20% while unplugged
    pub fn is_battery_low(&self) -> bool {
        !self.is_charging && self.battery_level < LOW_BATTERY_LEVEL
    }

    pub fn memory_usage_percent(&self) -> f64 {
        if self.total_memory_bytes == 0 {
            return 0.0;
        }
        let used = self
            .total_memory_bytes
            .saturating_sub(self.available_memory_bytes);
        used as f64 / self.total_memory_bytes as f64 * 100.0
    }
}

pub const LOW_BATTERY_LEVEL: f64 = 0.2;
