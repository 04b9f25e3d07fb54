use crate::commands::Commands;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "tempdb")]
#[command(about = "Run a disposable database server with throwaway storage")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Config file (defaults to tempdb.toml in the working directory)
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, global = true)]
    pub(crate) log_level: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub(crate) pretty: bool,
}
