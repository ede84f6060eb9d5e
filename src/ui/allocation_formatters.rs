use colored::*;

use crate::core::allocation::{
    AllocationChange, MemoryPressure, ModelInferenceSettings, RecommendationImpact,
    ResourceAdjustment, ResourceAllocation, ResourceRecommendation, SystemMetrics, ThermalState,
    ThrottleLevel,
};
use crate::core::config::Configuration;

use super::formatters::{format_percent, format_size, format_timestamp};

fn print_section_header(title: &str) {
    println!("\n{}", title.bold().green());
    println!("{}", "-".repeat(title.len()));
}

fn thermal_label(state: ThermalState) -> ColoredString {
    let text = state.to_string();
    match state {
        ThermalState::Nominal => text.green(),
        ThermalState::Fair => text.yellow(),
        ThermalState::Serious | ThermalState::Critical => text.red().bold(),
    }
}

fn pressure_label(pressure: MemoryPressure) -> ColoredString {
    let text = pressure.to_string();
    match pressure {
        MemoryPressure::Nominal => text.green(),
        MemoryPressure::Warning => text.yellow(),
        MemoryPressure::Critical => text.red().bold(),
    }
}

fn throttle_label(level: ThrottleLevel) -> ColoredString {
    let text = level.to_string();
    match level {
        ThrottleLevel::None => text.green(),
        ThrottleLevel::Light | ThrottleLevel::Moderate => text.yellow(),
        ThrottleLevel::Heavy | ThrottleLevel::Severe => text.red().bold(),
    }
}

fn enabled_label(enabled: bool) -> ColoredString {
    if enabled {
        "Enabled".green()
    } else {
        "Disabled".red()
    }
}

pub fn print_metrics(metrics: &SystemMetrics) {
    print_section_header("SYSTEM");

    println!(
        "  Memory: {} available of {} ({} used)",
        format_size(metrics.available_memory_bytes),
        format_size(metrics.total_memory_bytes),
        format_percent(metrics.memory_usage_percent())
    );
    println!("  Memory Pressure: {}", pressure_label(metrics.memory_pressure));
    println!("  Thermal State: {}", thermal_label(metrics.thermal_state));
    println!("  CPU Usage: {}", format_percent(metrics.cpu_usage_percent));

    if metrics.gpu_memory_total_bytes > 0 {
        println!(
            "  GPU: {} ({} / {})",
            format_percent(metrics.gpu_usage_percent),
            format_size(metrics.gpu_memory_used_bytes),
            format_size(metrics.gpu_memory_total_bytes)
        );
    }

    let power = if metrics.is_charging {
        "plugged in".green()
    } else if metrics.is_battery_low() {
        "on battery".red()
    } else {
        "on battery".yellow()
    };
    println!(
        "  Battery: {} ({})",
        format_percent(metrics.battery_level * 100.0),
        power
    );
}

pub fn print_allocation(allocation: &ResourceAllocation) {
    print_section_header("ALLOCATION");

    println!(
        "  Model Memory: {}",
        format_size(allocation.max_model_memory_bytes).bold()
    );
    println!("  KV Cache: {}", format_size(allocation.kv_cache_size_bytes));
    println!("  Quantization: {}", allocation.quantization_level.to_string().cyan());
    println!(
        "  Context Length: {} tokens",
        allocation.recommended_context_length
    );
    println!("  Batch Size: {}", allocation.recommended_batch_size);
    println!("  Throttle: {}", throttle_label(allocation.throttle_level));
    println!(
        "  GPU Acceleration: {}",
        enabled_label(allocation.use_gpu_acceleration)
    );
    println!("  Neural Engine: {}", enabled_label(allocation.use_neural_engine));
    println!(
        "  Estimated Speed: ~{:.0} tokens/s",
        allocation.effective_tokens_per_second
    );
}

pub fn print_recommendations(recommendations: &[ResourceRecommendation]) {
    print_section_header("RECOMMENDATIONS");

    if recommendations.is_empty() {
        println!("  {}", "No recommendations, resources look healthy".dimmed());
        return;
    }

    for recommendation in recommendations {
        let marker = match recommendation.impact {
            RecommendationImpact::High => "!".red().bold(),
            RecommendationImpact::Medium => "*".yellow(),
            RecommendationImpact::Low => "-".normal(),
        };
        println!("  {} {}", marker, recommendation.title.bold());
        println!("    {}", recommendation.description);
    }
}

pub fn print_model_settings(size_gb: f64, can_load: bool, settings: &ModelInferenceSettings) {
    print_section_header(&format!("MODEL ({:.1} GB)", size_gb));

    let verdict = if can_load {
        "Fits in current budget".green()
    } else {
        "Exceeds current budget".red()
    };
    println!("  {}", verdict);
    println!("  Quantization: {}", settings.quantization.to_string().cyan());
    println!("  Context Length: {} tokens", settings.context_length);
    println!("  Batch Size: {}", settings.batch_size);
    println!("  KV Cache: {}", format_size(settings.kv_cache_bytes));
    println!("  GPU: {}", enabled_label(settings.use_gpu));
    println!("  Neural Engine: {}", enabled_label(settings.use_neural_engine));
}

pub fn print_change(change: &AllocationChange) {
    let stamp = format_timestamp(change.timestamp).dimmed();
    let reason = if change.emergency {
        change.reason.red().bold()
    } else {
        change.reason.normal()
    };

    println!(
        "{} {} -> {} {} ctx {} batch {} throttle {}",
        stamp,
        reason,
        format_size(change.allocation.max_model_memory_bytes).bold(),
        change.allocation.quantization_level.to_string().cyan(),
        change.allocation.recommended_context_length,
        change.allocation.recommended_batch_size,
        throttle_label(change.allocation.throttle_level)
    );
}

pub fn print_history(history: &[ResourceAdjustment]) {
    print_section_header("ADJUSTMENT HISTORY");

    if history.is_empty() {
        println!("  {}", "No adjustments recorded".dimmed());
        return;
    }

    for adjustment in history {
        let reason = if adjustment.is_emergency() {
            adjustment.reason.red().bold()
        } else {
            adjustment.reason.normal()
        };
        println!(
            "  {} {}: {} -> {} ({} -> {})",
            format_timestamp(adjustment.timestamp).dimmed(),
            reason,
            format_size(adjustment.previous.max_model_memory_bytes),
            format_size(adjustment.new.max_model_memory_bytes),
            adjustment.previous.quantization_level,
            adjustment.new.quantization_level
        );
    }
}

pub fn print_configuration(config: &Configuration) {
    print_section_header("CONFIGURATION");

    println!(
        "  enable_dynamic_allocation: {}",
        config.enable_dynamic_allocation
    );
    println!(
        "  enable_battery_awareness: {}",
        config.enable_battery_awareness
    );
    println!("  enable_gpu_offload: {}", config.enable_gpu_offload);
    println!(
        "  enable_neural_engine_optimization: {}",
        config.enable_neural_engine_optimization
    );
    println!(
        "  reserve_system_memory_gb: {}",
        config.reserve_system_memory_gb
    );
    println!(
        "  max_model_memory_percent: {}",
        config.max_model_memory_percent
    );
    println!(
        "  min_model_memory_percent: {}",
        config.min_model_memory_percent
    );
    println!(
        "  kv_cache_memory_percent: {}",
        config.kv_cache_memory_percent
    );
    println!("  aggressiveness_level: {}", config.aggressiveness_level);
    println!(
        "  update_interval_seconds: {}",
        config.update_interval_seconds
    );
}
