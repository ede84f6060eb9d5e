//! User-facing advisories derived from the current snapshot.
//!
//! Regenerated in full on every call. Nothing is deduplicated or ranked, the
//! order only matters for display.

use serde::{Deserialize, Serialize};

use super::metrics::{MemoryPressure, SystemMetrics, ThermalState};
use super::types::ResourceAllocation;

/// Context lengths below this are worth explaining when memory is not the cause
pub const LOW_CONTEXT_THRESHOLD: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecommendation {
    pub title: String,
    pub description: String,
    pub impact: RecommendationImpact,
    pub action: RecommendationAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationImpact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAction {
    CoolDown,
    FreeMemory,
    UseSmallerModel,
    ConnectPower,
}

/// Build advisories for the given metrics and allocation
pub fn generate_recommendations(
    metrics: &SystemMetrics,
    allocation: &ResourceAllocation,
) -> Vec<ResourceRecommendation> {
    let mut recommendations = Vec::new();

    // Hot device
    if metrics.thermal_state >= ThermalState::Serious {
        recommendations.push(ResourceRecommendation {
            title: "Device is running hot".to_string(),
            description: format!(
                "Thermal state is {}. Inference is throttled to {} until the device cools down.",
                metrics.thermal_state, allocation.throttle_level
            ),
            impact: RecommendationImpact::High,
            action: RecommendationAction::CoolDown,
        });
    }

    // Low memory
    if metrics.memory_pressure == MemoryPressure::Warning {
        recommendations.push(ResourceRecommendation {
            title: "Memory is running low".to_string(),
            description: format!(
                "Memory usage at {:.1}%. Close other applications to give the model more room.",
                metrics.memory_usage_percent()
            ),
            impact: RecommendationImpact::Medium,
            action: RecommendationAction::FreeMemory,
        });
    }

    // Short context without memory pressure to explain it
    if allocation.recommended_context_length < LOW_CONTEXT_THRESHOLD
        && metrics.memory_pressure == MemoryPressure::Nominal
    {
        recommendations.push(ResourceRecommendation {
            title: "Limited context length".to_string(),
            description: format!(
                "Only {} tokens of context fit in the current budget. A smaller model leaves more room for context.",
                allocation.recommended_context_length
            ),
            impact: RecommendationImpact::Low,
            action: RecommendationAction::UseSmallerModel,
        });
    }

    // Low battery
    if metrics.is_battery_low() {
        recommendations.push(ResourceRecommendation {
            title: "Battery is low".to_string(),
            description: format!(
                "Battery at {:.0}%. Connect power for full inference performance.",
                metrics.battery_level.clamp(0.0, 1.0) * 100.0
            ),
            impact: RecommendationImpact::Medium,
            action: RecommendationAction::ConnectPower,
        });
    }

    recommendations
}
