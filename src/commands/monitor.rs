//! Continuous monitoring: prints every accepted adjustment until Ctrl-C.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use tokio::sync::{broadcast, mpsc};

use super::{build_manager_with, open_store};
use crate::core::config::load_or_default;
use crate::ui::{print_allocation, print_change, print_history};

/// Execute the monitor command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let store = open_store()?;
    let mut config = load_or_default(&store);

    // Interval override applies to this session only
    if let Some(interval) = matches.get_one::<f64>("interval").copied() {
        config.update_interval_seconds = interval;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .thread_name("inferguard-worker")
        .build()
        .context("Failed to build async runtime")?;

    let manager = build_manager_with(store, config);

    let (stop_tx, mut stop_rx) = mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    println!(
        "{} (every {:.1}s, Ctrl-C to stop)",
        "Monitoring resources".bold().bright_cyan(),
        manager.configuration().update_interval_seconds
    );
    print_allocation(&manager.current_allocation());
    println!();

    runtime.block_on(async {
        let mut changes = manager.subscribe();
        manager.start_monitoring()?;

        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Ok(change) => print_change(&change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Display lagged, {} changes skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = stop_rx.recv() => break,
            }
        }

        manager.stop_monitoring();
        anyhow::Ok(())
    })?;

    print_history(&manager.history());
    println!();

    Ok(())
}
