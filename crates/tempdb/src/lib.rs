//! Disposable database server processes for test suites.
//!
//! A [`Fixture`] allocates scratch storage (optionally seeded with a copy of
//! an existing data directory), boots the server as a daemon on a given
//! port, and blocks until the server log says it accepts client
//! connections. Dropping or closing the fixture sends SIGTERM, waits until
//! the OS no longer reports the process, and only then deletes the scratch
//! storage.
//!
//! ```no_run
//! use tempdb::{Fixture, FixtureConfig};
//!
//! let fixture = Fixture::start(FixtureConfig::default().with_port(11111))?;
//! let address = fixture.session().driver_address();
//! // ... connect a client to `address` ...
//! fixture.close()?;
//! # Ok::<(), tempdb::FixtureError>(())
//! ```

#[cfg(not(unix))]
compile_error!("tempdb signals daemonized server processes and supports unix targets only");

mod backoff;
mod diagnostics;
mod error;
mod fixture;
mod log_tail;
mod pid_file;
mod server_command;
mod session;
mod session_state;
mod shutdown;
mod storage;
mod supervisor;

#[cfg(test)]
mod tests;

pub use diagnostics::{DiagnosticSink, LogSink, MemorySink};
pub use error::{FixtureError, Result};
pub use fixture::{Fixture, run};
pub use log_tail::{BIND_FAILED_SENTINEL, LogEvent, LogTail, READY_SENTINEL};
pub use pid_file::{PidFile, is_process_running};
pub use server_command::ServerCommand;
pub use session::{Session, SessionInfo};
pub use session_state::SessionState;
pub use shutdown::ShutdownCoordinator;
pub use storage::{Storage, StorageKind, StorageProvisioner};
pub use supervisor::ProcessSupervisor;

pub use tempdb_config::FixtureConfig;
