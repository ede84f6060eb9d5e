use super::metrics::{MemoryPressure, SystemMetrics, ThermalState};

/// Source of hardware snapshots.
///
/// Implementations never fail: a probe that is unavailable on the platform
/// reports its documented fallback instead (GPU figures zero, battery
/// `(1.0, charging)`). Platform implementations live in the platform layer.
pub trait SystemMetricsProvider: Send + Sync {
    /// Take a complete snapshot. May block briefly on OS probes.
    fn collect(&self) -> SystemMetrics;

    /// Cheap read of the two event-driving signals.
    ///
    /// Providers without a cheap path return `None`, and no polling event
    /// source is started for them. Push-based sources deliver events through
    /// the manager's `notify_*` entry points instead.
    fn poll_signals(&self) -> Option<PressureSignals> {
        None
    }
}

/// The thermal and memory-pressure tiers at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PressureSignals {
    pub thermal_state: ThermalState,
    pub memory_pressure: MemoryPressure,
}

impl From<&SystemMetrics> for PressureSignals {
    fn from(metrics: &SystemMetrics) -> Self {
        Self {
            thermal_state: metrics.thermal_state,
            memory_pressure: metrics.memory_pressure,
        }
    }
}

/// Inbound trigger for an out-of-band evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsEvent {
    ThermalStateChanged(ThermalState),
    MemoryPressureChanged(MemoryPressure),
}

/// Turns successive signal readings into change events
#[derive(Debug, Default)]
pub struct SignalTracker {
    last: Option<PressureSignals>,
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading and return the events it implies.
    ///
    /// The first reading only establishes the baseline. Memory pressure
    /// events fire on any move into warning or critical; returning to
    /// nominal produces none.
    pub fn observe(&mut self, signals: PressureSignals) -> Vec<MetricsEvent> {
        let mut events = Vec::new();

        if let Some(last) = self.last {
            if signals.thermal_state != last.thermal_state {
                events.push(MetricsEvent::ThermalStateChanged(signals.thermal_state));
            }

            if signals.memory_pressure != last.memory_pressure
                && signals.memory_pressure != MemoryPressure::Nominal
            {
                events.push(MetricsEvent::MemoryPressureChanged(signals.memory_pressure));
            }
        }

        self.last = Some(signals);
        events
    }
}
