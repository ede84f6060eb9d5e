// Shared test doubles

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use inferguard::core::allocation::{
    PressureSignals, SystemMetrics, SystemMetricsProvider, BYTES_PER_GB,
};
use inferguard::core::config::{Configuration, InMemoryConfigStore};
use inferguard::ResourceManager;
use parking_lot::Mutex;

pub const GB: u64 = BYTES_PER_GB;

/// Provider returning whatever snapshot the test sets, counting collections
pub struct MockMetricsProvider {
    metrics: Mutex<SystemMetrics>,
    signals_enabled: bool,
    collects: AtomicUsize,
}

impl MockMetricsProvider {
    pub fn new(total_gb: u64, available_gb: u64) -> Arc<Self> {
        Arc::new(Self::build(total_gb, available_gb, false))
    }

    /// Provider that also supports signal polling
    pub fn with_signals(total_gb: u64, available_gb: u64) -> Arc<Self> {
        Arc::new(Self::build(total_gb, available_gb, true))
    }

    fn build(total_gb: u64, available_gb: u64, signals_enabled: bool) -> Self {
        Self {
            metrics: Mutex::new(SystemMetrics {
                total_memory_bytes: total_gb * GB,
                available_memory_bytes: available_gb * GB,
                ..Default::default()
            }),
            signals_enabled,
            collects: AtomicUsize::new(0),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut SystemMetrics)) {
        f(&mut self.metrics.lock());
    }

    pub fn collect_count(&self) -> usize {
        self.collects.load(Ordering::SeqCst)
    }
}

impl SystemMetricsProvider for MockMetricsProvider {
    fn collect(&self) -> SystemMetrics {
        self.collects.fetch_add(1, Ordering::SeqCst);
        self.metrics.lock().clone()
    }

    fn poll_signals(&self) -> Option<PressureSignals> {
        if self.signals_enabled {
            Some(PressureSignals::from(&*self.metrics.lock()))
        } else {
            None
        }
    }
}

/// 16GB machine, 2GB reserve, half of the rest for the model
pub fn reference_config() -> Configuration {
    Configuration {
        reserve_system_memory_gb: 2.0,
        max_model_memory_percent: 0.5,
        update_interval_seconds: 1.0,
        ..Default::default()
    }
}

pub fn manager_with(provider: Arc<MockMetricsProvider>, config: Configuration) -> ResourceManager {
    ResourceManager::with_configuration(provider, Arc::new(InMemoryConfigStore::new()), config)
}
