//! The allocation engine instance.
//!
//! `ResourceManager` owns its metrics provider and configuration store and
//! serializes every evaluation against the shared state: the current
//! allocation, the latest metrics snapshot and the adjustment history.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, Notify};

use super::calculator::{calculate, context_length};
use super::emergency::{emergency_allocation, EMERGENCY_REASON};
use super::history::{AdjustmentHistory, ResourceAdjustment};
use super::metrics::{MemoryPressure, SystemMetrics, ThermalState};
use super::policy::{generate_reason, should_adjust};
use super::provider::{MetricsEvent, SystemMetricsProvider};
use super::recommendations::{generate_recommendations, ResourceRecommendation};
use super::scheduler::MonitoringScheduler;
use super::types::*;
use crate::core::config::{load_or_default, ConfigStore, Configuration};
use crate::error::Result;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

pub const CONFIGURATION_REASON: &str = "Configuration updated";

/// What started an evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationTrigger {
    Scheduled,
    ThermalStateChanged(ThermalState),
    MemoryPressureChanged(MemoryPressure),
    ConfigurationUpdated,
}

impl From<MetricsEvent> for EvaluationTrigger {
    fn from(event: MetricsEvent) -> Self {
        match event {
            MetricsEvent::ThermalStateChanged(state) => EvaluationTrigger::ThermalStateChanged(state),
            MetricsEvent::MemoryPressureChanged(level) => {
                EvaluationTrigger::MemoryPressureChanged(level)
            }
        }
    }
}

impl fmt::Display for EvaluationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationTrigger::Scheduled => f.write_str("scheduled"),
            EvaluationTrigger::ThermalStateChanged(state) => write!(f, "thermal state -> {}", state),
            EvaluationTrigger::MemoryPressureChanged(level) => {
                write!(f, "memory pressure -> {}", level)
            }
            EvaluationTrigger::ConfigurationUpdated => f.write_str("configuration update"),
        }
    }
}

struct EngineState {
    current: ResourceAllocation,
    metrics: SystemMetrics,
    history: AdjustmentHistory,
}

/// Shared core used by the public handle and the monitoring tasks
pub(crate) struct EngineCore {
    provider: Arc<dyn SystemMetricsProvider>,
    store: Arc<dyn ConfigStore>,
    config: RwLock<Arc<Configuration>>,
    state: Mutex<EngineState>,
    // Held for a whole collect -> calculate -> commit pass
    pipeline: Mutex<()>,
    changes: broadcast::Sender<AllocationChange>,
    config_changed: Notify,
}

impl EngineCore {
    pub(crate) fn provider(&self) -> &Arc<dyn SystemMetricsProvider> {
        &self.provider
    }

    pub(crate) fn configuration(&self) -> Arc<Configuration> {
        self.config.read().clone()
    }

    /// Resolves once per configuration update; a missed update leaves a permit
    pub(crate) async fn configuration_changed(&self) {
        self.config_changed.notified().await;
    }

    /// Run one evaluation pass.
    ///
    /// `active` is re-checked right before committing; a pass whose
    /// monitoring session was stopped mid-flight discards its result.
    pub(crate) fn evaluate(
        &self,
        trigger: EvaluationTrigger,
        active: Option<&AtomicBool>,
    ) -> Option<AllocationChange> {
        let _pipeline = self.pipeline.lock();
        let config = self.configuration();

        if !config.enable_dynamic_allocation && trigger != EvaluationTrigger::ConfigurationUpdated {
            log::debug!("Dynamic allocation disabled, skipping {} evaluation", trigger);
            return None;
        }

        let metrics = self.provider.collect();
        let proposed = calculate(&metrics, &config);

        let mut state = self.state.lock();

        if let Some(active) = active {
            if !active.load(Ordering::SeqCst) {
                log::debug!("Monitoring stopped, discarding {} evaluation", trigger);
                return None;
            }
        }

        state.metrics = metrics.clone();

        let (accepted, reason) = if trigger == EvaluationTrigger::ConfigurationUpdated {
            (proposed != state.current, CONFIGURATION_REASON.to_string())
        } else {
            (
                should_adjust(&state.current, &proposed),
                generate_reason(&metrics),
            )
        };

        if !accepted {
            log::debug!(
                "Evaluation ({}) absorbed: budget {} -> {}",
                trigger,
                state.current.max_model_memory_bytes,
                proposed.max_model_memory_bytes
            );
            return None;
        }

        Some(self.commit(&mut state, proposed, metrics, reason, false))
    }

    /// Halve the current allocation in place of a regular evaluation
    pub(crate) fn apply_emergency(&self) -> AllocationChange {
        let _pipeline = self.pipeline.lock();
        let mut state = self.state.lock();
        let reduced = emergency_allocation(&state.current);
        let metrics = SystemMetrics {
            memory_pressure: MemoryPressure::Critical,
            ..state.metrics.clone()
        };

        log::warn!(
            "Critical memory pressure: reducing model budget to {} bytes",
            reduced.max_model_memory_bytes
        );

        self.commit(&mut state, reduced, metrics, EMERGENCY_REASON.to_string(), true)
    }

    fn commit(
        &self,
        state: &mut EngineState,
        allocation: ResourceAllocation,
        metrics: SystemMetrics,
        reason: String,
        emergency: bool,
    ) -> AllocationChange {
        let timestamp = Utc::now();
        let previous = std::mem::replace(&mut state.current, allocation.clone());

        state.history.push(ResourceAdjustment {
            reason: reason.clone(),
            previous,
            new: allocation.clone(),
            metrics_at_change: metrics,
            timestamp,
        });

        if !emergency {
            log::info!(
                "Allocation adjusted ({}): budget {} bytes, {}, context {}, throttle {}",
                reason,
                allocation.max_model_memory_bytes,
                allocation.quantization_level,
                allocation.recommended_context_length,
                allocation.throttle_level
            );
        }

        let change = AllocationChange {
            allocation,
            reason,
            emergency,
            timestamp,
        };

        // No subscribers is fine
        let _ = self.changes.send(change.clone());

        change
    }
}

/// Handle to an allocation engine; clones share the same engine
#[derive(Clone)]
pub struct ResourceManager {
    core: Arc<EngineCore>,
    scheduler: Arc<Mutex<MonitoringScheduler>>,
}

impl ResourceManager {
    /// Build an engine, loading its configuration from `store`.
    ///
    /// A missing or unreadable stored configuration falls back to defaults.
    pub fn new(provider: Arc<dyn SystemMetricsProvider>, store: Arc<dyn ConfigStore>) -> Self {
        let config = load_or_default(store.as_ref());
        Self::build(provider, store, config)
    }

    /// Build an engine with an explicit configuration, ignoring what `store` holds
    pub fn with_configuration(
        provider: Arc<dyn SystemMetricsProvider>,
        store: Arc<dyn ConfigStore>,
        config: Configuration,
    ) -> Self {
        Self::build(provider, store, config.sanitized())
    }

    fn build(
        provider: Arc<dyn SystemMetricsProvider>,
        store: Arc<dyn ConfigStore>,
        config: Configuration,
    ) -> Self {
        let metrics = provider.collect();
        let initial = calculate(&metrics, &config);
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        log::info!(
            "Initial allocation: budget {} bytes, {}, context {}",
            initial.max_model_memory_bytes,
            initial.quantization_level,
            initial.recommended_context_length
        );

        let core = EngineCore {
            provider,
            store,
            config: RwLock::new(Arc::new(config)),
            state: Mutex::new(EngineState {
                current: initial,
                metrics,
                history: AdjustmentHistory::new(),
            }),
            pipeline: Mutex::new(()),
            changes,
            config_changed: Notify::new(),
        };

        Self {
            core: Arc::new(core),
            scheduler: Arc::new(Mutex::new(MonitoringScheduler::new())),
        }
    }

    /// Refresh metrics and compute the allocation they call for.
    ///
    /// Does not replace the current allocation.
    pub fn calculate_optimal_allocation(&self) -> ResourceAllocation {
        let config = self.core.configuration();
        let metrics = self.core.provider.collect();
        let allocation = calculate(&metrics, &config);
        self.core.state.lock().metrics = metrics;
        allocation
    }

    /// Run one evaluation pass now, outside the monitoring loop
    pub fn evaluate_now(&self) -> Option<AllocationChange> {
        self.core.evaluate(EvaluationTrigger::Scheduled, None)
    }

    /// Start periodic monitoring. A no-op when already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_monitoring(&self) -> Result<()> {
        self.scheduler.lock().start(self.core.clone())
    }

    /// Stop periodic monitoring and drop event subscriptions. Always succeeds.
    pub fn stop_monitoring(&self) {
        self.scheduler.lock().stop();
    }

    pub fn is_monitoring(&self) -> bool {
        self.scheduler.lock().is_running()
    }

    /// Deliver a thermal-state change from an external source
    pub fn notify_thermal_state(&self, state: ThermalState) {
        self.scheduler
            .lock()
            .dispatch(&self.core, MetricsEvent::ThermalStateChanged(state));
    }

    /// Deliver a memory-pressure signal from an external source.
    ///
    /// Critical pressure reduces the allocation before this returns.
    pub fn notify_memory_pressure(&self, level: MemoryPressure) {
        self.scheduler
            .lock()
            .dispatch(&self.core, MetricsEvent::MemoryPressureChanged(level));
    }

    /// Subscribe to accepted adjustments
    pub fn subscribe(&self) -> broadcast::Receiver<AllocationChange> {
        self.core.changes.subscribe()
    }

    pub fn current_allocation(&self) -> ResourceAllocation {
        self.core.state.lock().current.clone()
    }

    pub fn current_metrics(&self) -> SystemMetrics {
        self.core.state.lock().metrics.clone()
    }

    /// Applied adjustments, oldest first
    pub fn history(&self) -> Vec<ResourceAdjustment> {
        self.core.state.lock().history.to_vec()
    }

    pub fn configuration(&self) -> Arc<Configuration> {
        self.core.configuration()
    }

    pub fn recommendations(&self) -> Vec<ResourceRecommendation> {
        let state = self.core.state.lock();
        generate_recommendations(&state.metrics, &state.current)
    }

    /// Replace the configuration, persist it and recompute.
    ///
    /// A failed save is logged; the new configuration is used regardless.
    pub fn update_configuration(&self, config: Configuration) -> Option<AllocationChange> {
        let config = config.sanitized();

        *self.core.config.write() = Arc::new(config.clone());
        self.core.config_changed.notify_one();
        log::info!("Configuration updated");

        if let Err(e) = self.core.store.save(&config) {
            log::error!("Failed to save configuration: {}", e);
        }

        self.core
            .evaluate(EvaluationTrigger::ConfigurationUpdated, None)
    }

    /// Whether a model of `size_gb` fits in the current memory budget
    pub fn can_load_model(&self, size_gb: f64) -> bool {
        match gb_to_bytes(size_gb) {
            Some(bytes) => bytes <= self.current_allocation().max_model_memory_bytes,
            None => false,
        }
    }

    /// Inference settings for a model of `size_gb` (fp16 weights) under the
    /// current allocation
    pub fn get_settings_for_model(&self, size_gb: f64) -> ModelInferenceSettings {
        settings_for_model(&self.current_allocation(), size_gb)
    }
}

fn gb_to_bytes(size_gb: f64) -> Option<u64> {
    if size_gb.is_finite() && size_gb >= 0.0 {
        Some((size_gb * BYTES_PER_GB as f64) as u64)
    } else {
        None
    }
}

/// Fit a model into an allocation.
///
/// A model that fits keeps the allocation's quantization. One that does not
/// is quantized further, to the most precise level at or below the
/// allocation's whose scaled size fits (q2 when none does). The context is
/// bounded by the KV cache left after the weights.
pub fn settings_for_model(allocation: &ResourceAllocation, size_gb: f64) -> ModelInferenceSettings {
    let budget = allocation.max_model_memory_bytes;
    let model_bytes = gb_to_bytes(size_gb).unwrap_or(u64::MAX);
    let fits_in_budget = model_bytes <= budget;

    let (quantization, weight_bytes) = if fits_in_budget {
        (allocation.quantization_level, model_bytes)
    } else {
        QuantizationLevel::ALL
            .iter()
            .filter(|level| **level <= allocation.quantization_level)
            .map(|level| (*level, scaled_bytes(model_bytes, *level)))
            .find(|(_, bytes)| *bytes <= budget)
            .unwrap_or_else(|| {
                let level = QuantizationLevel::Q2;
                (level, scaled_bytes(model_bytes, level))
            })
    };

    let kv_cache_bytes = allocation
        .kv_cache_size_bytes
        .min(budget.saturating_sub(weight_bytes));

    let context_length = allocation
        .recommended_context_length
        .min(context_length(kv_cache_bytes, quantization));

    ModelInferenceSettings {
        quantization,
        context_length,
        batch_size: if fits_in_budget {
            allocation.recommended_batch_size
        } else {
            1
        },
        kv_cache_bytes,
        use_gpu: allocation.use_gpu_acceleration,
        use_neural_engine: allocation.use_neural_engine,
        fits_in_budget,
    }
}

fn scaled_bytes(fp16_bytes: u64, level: QuantizationLevel) -> u64 {
    (fp16_bytes as f64 * level.size_ratio_to_fp16()) as u64
}
