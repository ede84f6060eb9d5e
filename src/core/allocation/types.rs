use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

pub const MIN_CONTEXT_LENGTH: u32 = 512;
pub const MAX_CONTEXT_LENGTH: u32 = 131_072;

// Reference architecture used to size the KV cache for every model.
const REFERENCE_LAYERS: u64 = 32;
const REFERENCE_HEADS: u64 = 32;
const REFERENCE_HEAD_DIM: u64 = 128;

/// Numeric precision of model weights.
///
/// Variants are declared from least to most precise so that `Ord` follows
/// precision (and memory footprint): `Q2 < Q4 < Q8 < Fp16 < Fp32`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QuantizationLevel {
    Q2,
    Q4,
    Q8,
    Fp16,
    Fp32,
}

impl QuantizationLevel {
    /// All levels, most precise first
    pub const ALL: [QuantizationLevel; 5] = [
        QuantizationLevel::Fp32,
        QuantizationLevel::Fp16,
        QuantizationLevel::Q8,
        QuantizationLevel::Q4,
        QuantizationLevel::Q2,
    ];

    /// Storage size of a single weight or activation element
    pub fn bytes_per_element(self) -> f64 {
        match self {
            QuantizationLevel::Fp32 => 4.0,
            QuantizationLevel::Fp16 => 2.0,
            QuantizationLevel::Q8 => 1.0,
            QuantizationLevel::Q4 => 0.5,
            QuantizationLevel::Q2 => 0.25,
        }
    }

    /// KV-cache bytes per token: `2 (K and V) × layers × heads × head_dim × element size`.
    ///
    /// Always computed for the 32-layer / 32-head / 128-dim reference
    /// architecture, whatever model is actually loaded. Models with a
    /// different shape get an approximate context length.
    pub fn kv_bytes_per_token(self) -> u64 {
        let elements = 2 * REFERENCE_LAYERS * REFERENCE_HEADS * REFERENCE_HEAD_DIM;
        (elements as f64 * self.bytes_per_element()) as u64
    }

    /// Baseline generation speed in tokens/sec before throttling and acceleration
    pub fn base_tokens_per_second(self) -> f64 {
        match self {
            QuantizationLevel::Fp32 => 5.0,
            QuantizationLevel::Fp16 => 15.0,
            QuantizationLevel::Q8 => 30.0,
            QuantizationLevel::Q4 => 50.0,
            QuantizationLevel::Q2 => 60.0,
        }
    }

    /// Size factor relative to fp16 weights
    pub fn size_ratio_to_fp16(self) -> f64 {
        self.bytes_per_element() / QuantizationLevel::Fp16.bytes_per_element()
    }
}

impl fmt::Display for QuantizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuantizationLevel::Fp32 => "fp32",
            QuantizationLevel::Fp16 => "fp16",
            QuantizationLevel::Q8 => "q8",
            QuantizationLevel::Q4 => "q4",
            QuantizationLevel::Q2 => "q2",
        };
        f.write_str(name)
    }
}

/// Combined severity of thermal, memory and battery constraints
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ThrottleLevel {
    #[default]
    None,
    Light,
    Moderate,
    Heavy,
    Severe,
}

impl ThrottleLevel {
    /// Map an additive constraint score to a tier
    pub fn from_score(score: u32) -> Self {
        match score {
            0 => ThrottleLevel::None,
            1 => ThrottleLevel::Light,
            2 => ThrottleLevel::Moderate,
            3..=4 => ThrottleLevel::Heavy,
            _ => ThrottleLevel::Severe,
        }
    }

    /// Fraction of the baseline throughput left at this tier
    pub fn speed_factor(self) -> f64 {
        match self {
            ThrottleLevel::None => 1.0,
            ThrottleLevel::Light => 0.9,
            ThrottleLevel::Moderate => 0.75,
            ThrottleLevel::Heavy => 0.5,
            ThrottleLevel::Severe => 0.25,
        }
    }
}

impl fmt::Display for ThrottleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThrottleLevel::None => "none",
            ThrottleLevel::Light => "light",
            ThrottleLevel::Moderate => "moderate",
            ThrottleLevel::Heavy => "heavy",
            ThrottleLevel::Severe => "severe",
        };
        f.write_str(name)
    }
}

/// Resource budget for inference, replaced wholesale on every accepted change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub max_model_memory_bytes: u64,
    pub kv_cache_size_bytes: u64,
    pub quantization_level: QuantizationLevel,
    pub recommended_context_length: u32,
    pub recommended_batch_size: u32,
    pub throttle_level: ThrottleLevel,
    pub use_gpu_acceleration: bool,
    pub use_neural_engine: bool,
    /// Advisory estimate, never used to gate decisions
    pub effective_tokens_per_second: f64,
}

impl ResourceAllocation {
    pub fn max_model_memory_gb(&self) -> f64 {
        self.max_model_memory_bytes as f64 / BYTES_PER_GB as f64
    }
}

/// Per-model settings derived from the current allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInferenceSettings {
    pub quantization: QuantizationLevel,
    pub context_length: u32,
    pub batch_size: u32,
    pub kv_cache_bytes: u64,
    pub use_gpu: bool,
    pub use_neural_engine: bool,
    /// Whether the model fits at the requested size without extra quantization
    pub fits_in_budget: bool,
}

/// Broadcast on every accepted adjustment
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationChange {
    pub allocation: ResourceAllocation,
    pub reason: String,
    pub emergency: bool,
    pub timestamp: DateTime<Utc>,
}

/// Clamp a raw token count into the supported context range
pub fn clamp_context_length(tokens: u64) -> u32 {
    tokens.clamp(MIN_CONTEXT_LENGTH as u64, MAX_CONTEXT_LENGTH as u64) as u32
}
