//! Configuration for temporary database fixtures.
//!
//! A [`FixtureConfig`] is built in code by test authors, or loaded from a
//! `tempdb.toml` file with `TEMPDB_*` environment overrides applied on top.

mod config;
mod error;
mod log_level;
mod logging_settings;
mod resilience_settings;
mod server_settings;
mod storage_settings;

#[cfg(test)]
mod tests;

pub use config::FixtureConfig;
pub use error::{ConfigError, ConfigErrorResult};
pub use log_level::LogLevel;
pub use logging_settings::LoggingSettings;
pub use resilience_settings::ResilienceSettings;
pub use server_settings::ServerSettings;
pub use storage_settings::StorageSettings;

pub const DEFAULT_CONFIG_FILENAME: &str = "tempdb.toml";

const DEFAULT_SERVER_BINARY: &str = "rethinkdb";
const DEFAULT_PORT: u16 = 28015;
const DEFAULT_LOG_FILE_NAME: &str = "log_file";
const DEFAULT_PID_FILE_NAME: &str = "pidfile";

const DEFAULT_SEED_SUBDIRECTORY: &str = "rethinkdb_data";
const DEFAULT_SCRATCH_PREFIX: &str = "tempdb-";

const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 5;
const DEFAULT_MAX_BACKOFF_MS: u64 = 250;

const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60; // 1 day

const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_TARGET: &str = "tempdb";
