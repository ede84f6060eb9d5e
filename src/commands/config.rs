use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use super::open_store;
use crate::core::config::{load_or_default, ConfigStore, Configuration, CONFIG_KEYS};
use crate::ui::print_configuration;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("set", sub_matches)) => set(sub_matches),
        Some(("reset", _)) => reset(),
        _ => {
            println!("Use 'inferguard config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let store = open_store()?;
    let config = load_or_default(&store);

    print_configuration(&config);
    println!("\n  {} {}", "Stored at:".dimmed(), store.path().display());
    println!();

    Ok(())
}

fn set(matches: &ArgMatches) -> Result<()> {
    let key = matches
        .get_one::<String>("key")
        .context("Key argument is required")?;
    let value = matches
        .get_one::<String>("value")
        .context("Value argument is required")?;

    let store = open_store()?;
    let mut config = load_or_default(&store);

    if let Err(e) = config.set_value(key, value) {
        println!("Valid keys: {}", CONFIG_KEYS.join(", ").dimmed());
        return Err(e.into());
    }

    let config = config.sanitized();
    store.save(&config).context("Failed to save configuration")?;

    println!("{} {} updated", "✓".green(), key.bold());

    Ok(())
}

fn reset() -> Result<()> {
    let store = open_store()?;
    store
        .save(&Configuration::default())
        .context("Failed to save configuration")?;

    println!("{} Configuration reset to defaults", "✓".green());

    Ok(())
}
