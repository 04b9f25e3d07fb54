//! tempdb - disposable database servers from the shell
//!
//! # Examples
//!
//! ```bash
//! # Start an empty server on port 28016 and print where it lives
//! tempdb run --port 28016 --pretty
//!
//! # Start from a copy of an existing data directory
//! tempdb run --data-directory ./fixtures/rethinkdb_data
//!
//! # Show the configuration after file and environment overrides
//! tempdb config
//! ```

mod cli;
mod commands;
mod error;
mod logger;
mod run_command;


use crate::{
    cli::Cli,
    commands::Commands,
    error::CliResult,
};

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tempdb_config::{DEFAULT_CONFIG_FILENAME, FixtureConfig, LogLevel};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: {}", e.recovery_hint());
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> CliResult<()> {
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));
    let config = FixtureConfig::load(&config_path)?;

    // --log-level beats the config file
    let log_level = cli
        .log_level
        .as_deref()
        .map(|level| level.parse::<LogLevel>().unwrap_or_default())
        .unwrap_or(config.logging.level);
    logger::initialize(log_level, std::io::stderr().is_terminal())?;

    match cli.command {
        Commands::Run(args) => run_command::run(args.apply(config), cli.pretty),
        Commands::Config => run_command::print_config(&config),
    }
}
