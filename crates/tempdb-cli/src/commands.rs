use std::path::PathBuf;

use clap::{Args, Subcommand};
use tempdb_config::FixtureConfig;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start a server and keep it running until SIGINT or SIGTERM
    Run(RunArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Client driver port
    #[arg(long)]
    pub(crate) port: Option<u16>,

    /// Existing data directory to copy into scratch storage
    #[arg(long)]
    pub(crate) data_directory: Option<PathBuf>,

    /// Directory to use as storage in place; never deleted
    #[arg(long)]
    pub(crate) path: Option<PathBuf>,

    /// Server executable
    #[arg(long)]
    pub(crate) binary: Option<PathBuf>,

    /// Seconds to wait for the server to accept connections
    #[arg(long)]
    pub(crate) startup_timeout: Option<u64>,
}

impl RunArgs {
    /// Layer command-line flags over the loaded configuration.
    pub(crate) fn apply(self, mut config: FixtureConfig) -> FixtureConfig {
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(data_directory) = self.data_directory {
            config = config.with_data_directory(data_directory);
        }
        if let Some(path) = self.path {
            config = config.with_path(path);
        }
        if let Some(binary) = self.binary {
            config = config.with_binary(binary);
        }
        if let Some(secs) = self.startup_timeout {
            config = config.with_startup_timeout_secs(secs);
        }
        config
    }
}
