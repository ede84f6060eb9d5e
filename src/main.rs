use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use inferguard::commands;

fn main() -> Result<()> {
    let matches = Command::new("inferguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Adaptive resource allocation for local model inference")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("status")
                .about("Show current metrics, allocation and recommendations")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the snapshot as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("monitor")
                .about("Monitor resources and print every allocation change")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECONDS")
                        .help("Re-evaluation interval for this session")
                        .value_parser(clap::value_parser!(f64)),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Check whether a model fits the current allocation")
                .arg(
                    Arg::new("size")
                        .help("Model size in GB (fp16 weights)")
                        .required(true)
                        .index(1)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the settings as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("View or edit the persisted configuration (use 'inferguard config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Show the current configuration"))
                .subcommand(
                    Command::new("set")
                        .about("Set a configuration value")
                        .arg(
                            Arg::new("key")
                                .help("Configuration key")
                                .required(true)
                                .index(1),
                        )
                        .arg(
                            Arg::new("value")
                                .help("New value")
                                .required(true)
                                .index(2),
                        ),
                )
                .subcommand(Command::new("reset").about("Restore default configuration")),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    inferguard::init_logging_with(level);

    match matches.subcommand() {
        Some(("status", sub_matches)) => commands::status(sub_matches)?,
        Some(("monitor", sub_matches)) => commands::monitor(sub_matches)?,
        Some(("check", sub_matches)) => commands::check(sub_matches)?,
        Some(("config", sub_matches)) => commands::config::execute(sub_matches)?,
        _ => {
            println!("Welcome to inferguard!");
            println!("Use 'inferguard --help' for more information.");
        }
    }

    Ok(())
}
