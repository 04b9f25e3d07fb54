use crate::error::{CliError, CliResult};

use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use log::info;
use serde::Serialize;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tempdb::{Fixture, Session};
use tempdb_config::FixtureConfig;

/// What a caller needs to reach the server, printed once it is ready.
#[derive(Debug, Serialize)]
pub(crate) struct FixtureOutput {
    pub(crate) port: u16,
    pub(crate) storage_path: PathBuf,
    pub(crate) pid: Option<i32>,
    pub(crate) log_path: PathBuf,
}

impl From<&Session> for FixtureOutput {
    fn from(session: &Session) -> Self {
        Self {
            port: session.port(),
            storage_path: session.storage_path().to_path_buf(),
            pid: session.process_id(),
            log_path: session.log_path().to_path_buf(),
        }
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T, pretty: bool) -> CliResult<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Start a fixture, print where it lives, and hold it until a signal arrives.
pub(crate) fn run(config: FixtureConfig, pretty: bool) -> CliResult<()> {
    // Registered before the server starts so an early Ctrl-C still tears down.
    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|source| CliError::Signal {
        source,
        location: ErrorLocation::from(Location::caller()),
    })?;

    config.log_summary();
    let fixture = Fixture::start(config)?;

    println!("{}", to_json(&FixtureOutput::from(fixture.session()), pretty)?);

    if let Some(sig) = signals.forever().next() {
        info!("Received signal {sig}, shutting down...");
    }

    fixture.close()?;
    info!("Server stopped and storage released");

    Ok(())
}

/// Print the effective configuration.
pub(crate) fn print_config(config: &FixtureConfig) -> CliResult<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
