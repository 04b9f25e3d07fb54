use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use nix::errno::Errno;
use tempdb_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Invalid fixture configuration: {message} {location}")]
    Configuration {
        message: String,
        location: ErrorLocation,
    },

    #[error("Failed to allocate scratch storage: {source} {location}")]
    StorageAllocation {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Failed to copy seed data from {from} to {to}: {source} {location}")]
    SeedCopy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Failed to remove scratch storage at {path}: {source} {location}")]
    StorageRelease {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Failed to spawn server binary {binary}: {source} {location}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Server failed to start (exit code {code:?}): {stderr} {location}")]
    Launch {
        code: Option<i32>,
        stderr: String,
        location: ErrorLocation,
    },

    #[error("Port {port} is already in use by another process {location}")]
    PortInUse { port: u16, location: ErrorLocation },

    #[error("Failed to terminate server process {pid}: {source} {location}")]
    Termination {
        pid: i32,
        #[source]
        source: Errno,
        location: ErrorLocation,
    },

    #[error("Server failed to become ready within {timeout_secs}s {location}")]
    StartupTimeout {
        timeout_secs: u64,
        location: ErrorLocation,
    },

    #[error("Server process {pid} still running {timeout_secs}s after termination request {location}")]
    ShutdownTimeout {
        pid: i32,
        timeout_secs: u64,
        location: ErrorLocation,
    },

    #[error("PID file {path} does not contain a process id: {contents:?} {location}")]
    PidFileInvalid {
        path: PathBuf,
        contents: String,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },
}

impl FixtureError {
    /// Build a configuration error.
    #[track_caller]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Whether a bounded wait ran out, as opposed to a definite failure.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::StartupTimeout { .. } | Self::ShutdownTimeout { .. }
        )
    }

    pub fn is_port_in_use(&self) -> bool {
        matches!(self, Self::PortInUse { .. })
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => {
                "Pass either a data directory to copy or an explicit storage path, not both, \
                   and check the remaining settings named in the message."
            }
            Self::Spawn { .. } => {
                "The server binary could not be executed. \
                   Install it or point server.binary / TEMPDB_SERVER_BINARY at it."
            }
            Self::Launch { .. } => {
                "The server refused to start. \
                   Check its stderr output above and the storage directory permissions."
            }
            Self::PortInUse { .. } => {
                "Another process is bound to the requested port. \
                   Stop it or run the fixture on a different port."
            }
            Self::Termination {
                source: Errno::ESRCH,
                ..
            } => {
                "The PID file named a process that no longer exists; the server exited on its own. \
                   Check the server log for a crash."
            }
            Self::Termination { .. } => {
                "The server process could not be signalled. \
                   It may belong to another user; stop it manually."
            }
            Self::StartupTimeout { .. } => {
                "The server did not report readiness in time. \
                   Raise resilience.startup_timeout_secs or inspect the server log."
            }
            Self::ShutdownTimeout { .. } => {
                "The server did not exit in time; its scratch storage was left in place. \
                   Stop the process manually and remove the directory."
            }
            Self::SeedCopy { .. } => {
                "The seed data directory could not be copied. \
                   Check that it is readable and that the temp directory has space."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<ConfigError> for FixtureError {
    #[track_caller]
    fn from(source: ConfigError) -> Self {
        Self::Configuration {
            message: source.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for FixtureError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FixtureError>;
