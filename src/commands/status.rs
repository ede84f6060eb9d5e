//! One-shot snapshot: metrics, allocation and recommendations.

use anyhow::Result;
use clap::ArgMatches;
use serde_json::json;

use super::build_manager;
use crate::ui::{print_allocation, print_metrics, print_recommendations};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let manager = build_manager()?;

    let metrics = manager.current_metrics();
    let allocation = manager.current_allocation();
    let recommendations = manager.recommendations();

    if matches.get_flag("json") {
        let report = json!({
            "metrics": {
                "total_memory_bytes": metrics.total_memory_bytes,
                "available_memory_bytes": metrics.available_memory_bytes,
                "thermal_state": metrics.thermal_state,
                "memory_pressure": metrics.memory_pressure,
                "cpu_usage_percent": metrics.cpu_usage_percent,
                "gpu_usage_percent": metrics.gpu_usage_percent,
                "gpu_memory_used_bytes": metrics.gpu_memory_used_bytes,
                "gpu_memory_total_bytes": metrics.gpu_memory_total_bytes,
                "battery_level": metrics.battery_level,
                "is_charging": metrics.is_charging,
            },
            "allocation": allocation,
            "recommendations": recommendations,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_metrics(&metrics);
    print_allocation(&allocation);
    print_recommendations(&recommendations);
    println!();

    Ok(())
}
