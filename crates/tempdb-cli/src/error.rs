use std::panic::Location;

use error_location::ErrorLocation;
use tempdb::FixtureError;
use tempdb_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Fixture(#[from] FixtureError),

    #[error("Failed to initialize logger: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    #[error("Failed to register signal handlers: {source} {location}")]
    Signal {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Failed to serialize output: {source} {location}")]
    Output {
        #[source]
        source: serde_json::Error,
        location: ErrorLocation,
    },
}

impl CliError {
    #[track_caller]
    pub fn logger<S: Into<String>>(message: S) -> Self {
        Self::Logger {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::Config(_) => "Fix the config file or the TEMPDB_* environment variables.",
            Self::Fixture(e) => e.recovery_hint(),
            Self::Signal { .. } => "Signal handlers could not be installed; stop the server manually.",
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<serde_json::Error> for CliError {
    #[track_caller]
    fn from(source: serde_json::Error) -> Self {
        Self::Output {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type CliResult<T> = std::result::Result<T, CliError>;
