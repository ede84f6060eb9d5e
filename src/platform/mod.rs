//! Platform-specific metric probes.
//!
//! Provides the `SystemMetricsProvider` used outside of tests.

mod power;
pub mod gpu;
mod sysinfo_provider;

pub use power::{read_battery, BATTERY_FALLBACK};
pub use gpu::{get_gpu_probe, GpuProbe, GpuReading};
pub use sysinfo_provider::{memory_pressure_from_ratio, thermal_state_from_reading, SysinfoMetricsProvider};
