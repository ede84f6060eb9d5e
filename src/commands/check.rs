//! Check whether a model of a given size fits the current allocation.

use anyhow::{Context, Result};
use clap::ArgMatches;

use super::build_manager;
use crate::ui::print_model_settings;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let size_gb = *matches
        .get_one::<f64>("size")
        .context("Model size argument is required")?;

    if !size_gb.is_finite() || size_gb <= 0.0 {
        anyhow::bail!("Model size must be a positive number of GB, got {}", size_gb);
    }

    let manager = build_manager()?;
    let can_load = manager.can_load_model(size_gb);
    let settings = manager.get_settings_for_model(size_gb);

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    print_model_settings(size_gb, can_load, &settings);
    println!();

    Ok(())
}
