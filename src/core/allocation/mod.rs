//! Adaptive resource allocation for local inference.
//!
//! Fuses thermal, memory-pressure, CPU/GPU and battery signals into a single
//! memory/context/batch/quantization budget, re-evaluated on a schedule and
//! on events, with hysteresis and an emergency fast path.

mod calculator;
pub mod emergency;
mod history;
mod manager;
mod metrics;
mod policy;
mod provider;
pub mod recommendations;
mod scheduler;
mod types;

pub use calculator::{
    batch_size, calculate, context_length, effective_available_memory,
    estimate_tokens_per_second, select_quantization, throttle_level,
};
pub use emergency::{emergency_allocation, EMERGENCY_CONTEXT_CAP, EMERGENCY_REASON};
pub use history::{AdjustmentHistory, ResourceAdjustment, DEFAULT_HISTORY_SIZE};
pub use manager::{settings_for_model, EvaluationTrigger, ResourceManager, CONFIGURATION_REASON};
pub use metrics::{MemoryPressure, SystemMetrics, ThermalState, LOW_BATTERY_LEVEL};
pub use policy::{
    generate_reason, memory_change_ratio, should_adjust, MEMORY_CHANGE_THRESHOLD, ROUTINE_REASON,
};
pub use provider::{MetricsEvent, PressureSignals, SignalTracker, SystemMetricsProvider};
pub use recommendations::{
    generate_recommendations, RecommendationAction, RecommendationImpact, ResourceRecommendation,
};
pub use scheduler::SIGNAL_POLL_INTERVAL;
pub use types::{
    clamp_context_length, AllocationChange, ModelInferenceSettings, QuantizationLevel,
    ResourceAllocation, ThrottleLevel, BYTES_PER_GB, MAX_CONTEXT_LENGTH, MIN_CONTEXT_LENGTH,
};
