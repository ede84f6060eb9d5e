use std::time::Instant;

use parking_lot::Mutex;
use sysinfo::{
    Components, CpuRefreshKind, MemoryRefreshKind, RefreshKind, System,
    MINIMUM_CPU_UPDATE_INTERVAL,
};

use super::gpu::{get_gpu_probe, GpuProbe, GpuReading};
use super::power::read_battery;
use crate::core::allocation::{
    MemoryPressure, PressureSignals, SystemMetrics, SystemMetricsProvider, ThermalState,
};

// Available-memory ratios below which pressure is reported
const PRESSURE_WARNING_RATIO: f64 = 0.15;
const PRESSURE_CRITICAL_RATIO: f64 = 0.05;

// Absolute sensor thresholds (°C) for components without a critical value
const FAIR_CELSIUS: f32 = 70.0;
const SERIOUS_CELSIUS: f32 = 85.0;
const CRITICAL_CELSIUS: f32 = 95.0;

struct Probes {
    system: System,
    last_cpu_refresh: Instant,
    components: Components,
    gpu: Option<Box<dyn GpuProbe>>,
}

/// Cross-platform provider built on sysinfo, the battery crate and NVML
pub struct SysinfoMetricsProvider {
    probes: Mutex<Probes>,
}

impl SysinfoMetricsProvider {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());

        let mut system = System::new_with_specifics(refresh_kind);

        // CPU usage is a delta between two samples
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu_usage();
        let last_cpu_refresh = Instant::now();

        let components = Components::new_with_refreshed_list();

        // Try to initialize GPU probe (graceful failure)
        let gpu = match get_gpu_probe() {
            Ok(probe) => {
                log::info!("Using {} GPU probe", probe.name());
                Some(probe)
            }
            Err(e) => {
                log::debug!("GPU probe not available: {}", e);
                None
            }
        };

        Self {
            probes: Mutex::new(Probes {
                system,
                last_cpu_refresh,
                components,
                gpu,
            }),
        }
    }
}

impl Default for SysinfoMetricsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Probes {
    fn refresh_signals(&mut self) -> PressureSignals {
        self.system.refresh_memory();
        self.components.refresh(true);

        PressureSignals {
            thermal_state: self.thermal_state(),
            memory_pressure: memory_pressure_from_ratio(
                self.system.available_memory(),
                self.system.total_memory(),
            ),
        }
    }

    /// Refresh CPU usage unless the last sample is too recent to diff against
    fn refresh_cpu_if_due(&mut self) {
        let now = Instant::now();
        if cpu_refresh_due(self.last_cpu_refresh, now) {
            self.system.refresh_cpu_usage();
            self.last_cpu_refresh = now;
        }
    }

    fn thermal_state(&self) -> ThermalState {
        self.components
            .iter()
            .filter_map(|component| {
                component
                    .temperature()
                    .map(|celsius| thermal_state_from_reading(celsius, component.critical()))
            })
            .max()
            .unwrap_or(ThermalState::Nominal)
    }

    fn gpu_reading(&mut self) -> GpuReading {
        let Some(probe) = self.gpu.as_mut() else {
            return GpuReading::default();
        };

        match probe.read() {
            Ok(reading) => reading,
            Err(e) => {
                log::warn!("GPU read failed, reporting zero: {}", e);
                GpuReading::default()
            }
        }
    }
}

impl SystemMetricsProvider for SysinfoMetricsProvider {
    fn collect(&self) -> SystemMetrics {
        let mut probes = self.probes.lock();

        let signals = probes.refresh_signals();
        probes.refresh_cpu_if_due();
        let gpu = probes.gpu_reading();
        let (battery_level, is_charging) = read_battery();

        SystemMetrics {
            total_memory_bytes: probes.system.total_memory(),
            available_memory_bytes: probes.system.available_memory(),
            thermal_state: signals.thermal_state,
            memory_pressure: signals.memory_pressure,
            cpu_usage_percent: f64::from(probes.system.global_cpu_usage()).clamp(0.0, 100.0),
            gpu_usage_percent: gpu.utilization_percent,
            gpu_memory_used_bytes: gpu.memory_used_bytes,
            gpu_memory_total_bytes: gpu.memory_total_bytes,
            battery_level,
            is_charging,
            timestamp: Instant::now(),
        }
    }

    fn poll_signals(&self) -> Option<PressureSignals> {
        Some(self.probes.lock().refresh_signals())
    }
}

fn cpu_refresh_due(last: Instant, now: Instant) -> bool {
    now.saturating_duration_since(last) >= MINIMUM_CPU_UPDATE_INTERVAL
}

/// Memory pressure tier from the share of memory still available
pub fn memory_pressure_from_ratio(available: u64, total: u64) -> MemoryPressure {
    if total == 0 {
        return MemoryPressure::Nominal;
    }

    let ratio = available as f64 / total as f64;
    if ratio < PRESSURE_CRITICAL_RATIO {
        MemoryPressure::Critical
    } else if ratio < PRESSURE_WARNING_RATIO {
        MemoryPressure::Warning
    } else {
        MemoryPressure::Nominal
    }
}

/// Thermal tier for one sensor, relative to its critical point when known
pub fn thermal_state_from_reading(celsius: f32, critical: Option<f32>) -> ThermalState {
    if !celsius.is_finite() {
        return ThermalState::Nominal;
    }

    match critical.filter(|c| c.is_finite() && *c > 0.0) {
        Some(critical) => {
            let ratio = celsius / critical;
            if ratio >= 0.95 {
                ThermalState::Critical
            } else if ratio >= 0.85 {
                ThermalState::Serious
            } else if ratio >= 0.75 {
                ThermalState::Fair
            } else {
                ThermalState::Nominal
            }
        }
        None => {
            if celsius >= CRITICAL_CELSIUS {
                ThermalState::Critical
            } else if celsius >= SERIOUS_CELSIUS {
                ThermalState::Serious
            } else if celsius >= FAIR_CELSIUS {
                ThermalState::Fair
            } else {
                ThermalState::Nominal
            }
        }
    }
}
