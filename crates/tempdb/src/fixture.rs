//! Scoped fixture: storage and server torn down on every exit path.

use crate::diagnostics::{DiagnosticSink, Diagnostics, LogSink};
use crate::{
    ProcessSupervisor, Result, Session, SessionState, ShutdownCoordinator, Storage,
    StorageProvisioner,
};

use std::sync::Arc;

use tempdb_config::FixtureConfig;

/// A running server plus the storage behind it.
///
/// Teardown stops the process first and releases storage only once the
/// process is confirmed gone. It runs on [`Fixture::close`], or on drop
/// when the fixture goes out of scope through an early return or a panic.
pub struct Fixture {
    session: Session,
    storage: Option<Storage>,
    provisioner: StorageProvisioner,
    shutdown: ShutdownCoordinator,
    diagnostics: Diagnostics,
    closed: bool,
}

impl Fixture {
    /// Start a fixture that reports to the `log` target from its config.
    pub fn start(config: FixtureConfig) -> Result<Self> {
        let sink = Arc::new(LogSink::new(config.logging.target.clone()));
        Self::start_with_sink(config, sink)
    }

    /// Start a fixture that reports to `sink`.
    ///
    /// The configuration is validated before any storage is allocated or any
    /// process spawned. If the server fails to start, the fixture is torn
    /// down before the launch error is returned.
    pub fn start_with_sink(config: FixtureConfig, sink: Arc<dyn DiagnosticSink>) -> Result<Self> {
        config.validate()?;

        let provisioner = StorageProvisioner::new(&config.storage, sink.clone());
        let storage = provisioner.acquire(
            config.storage.data_directory.as_deref(),
            config.storage.path.as_deref(),
        )?;

        let session = Session::new(
            &storage,
            config.server.port,
            &config.server.log_file_name,
            &config.server.pid_file_name,
        );

        let mut fixture = Self {
            session,
            storage: Some(storage),
            provisioner,
            shutdown: ShutdownCoordinator::new(&config, sink.clone()),
            diagnostics: Diagnostics::new(sink.clone()),
            closed: false,
        };

        let supervisor = ProcessSupervisor::new(&config, sink);
        if let Err(launch_error) = supervisor.launch(&mut fixture.session) {
            if let Err(teardown_error) = fixture.teardown() {
                fixture
                    .diagnostics
                    .error(format!("Teardown after failed launch also failed: {teardown_error}"));
            }
            return Err(launch_error);
        }

        Ok(fixture)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn port(&self) -> u16 {
        self.session.port()
    }

    /// Stop the server and release storage, reporting any failure.
    pub fn close(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let stopped = self.shutdown.stop(&mut self.session);

        let released = match self.storage.take() {
            Some(storage) if self.session.state() == SessionState::Stopped => {
                self.provisioner.release(storage)
            }
            Some(storage) => {
                let path = storage.leak();
                self.diagnostics.warn(format!(
                    "Leaving scratch storage {} in place: server process may still be running",
                    path.display()
                ));
                Ok(())
            }
            None => Ok(()),
        };

        stopped.and(released)
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            self.diagnostics
                .error(format!("Fixture teardown failed: {e}"));
        }
    }
}

/// Run `f` against a fresh fixture and tear it down afterwards.
///
/// Teardown also runs if `f` panics; the panic then continues.
///
/// ```no_run
/// use tempdb::FixtureConfig;
///
/// let port = tempdb::run(FixtureConfig::default().with_port(11111), |session| {
///     session.port()
/// })?;
/// assert_eq!(port, 11111);
/// # Ok::<(), tempdb::FixtureError>(())
/// ```
pub fn run<F, R>(config: FixtureConfig, f: F) -> Result<R>
where
    F: FnOnce(&Session) -> R,
{
    let fixture = Fixture::start(config)?;
    let output = f(fixture.session());
    fixture.close()?;
    Ok(output)
}
