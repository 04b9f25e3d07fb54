//! Server launch and readiness detection.

use crate::backoff::{Backoff, Probe, poll_until};
use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::log_tail::{LogEvent, LogTail};
use crate::pid_file::{PidFile, is_process_running, remove_if_exists};
use crate::{FixtureError, Result, ServerCommand, Session, SessionState};

use std::io::Read;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use error_location::ErrorLocation;
use tempdb_config::{FixtureConfig, ResilienceSettings};

/// What the readiness loop observed.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Startup {
    /// Ready sentinel seen and the PID file names the daemon
    Ready(i32),
    /// Bind failure sentinel seen and the daemon removed its PID file
    PortInUse,
    /// The daemon exited before logging any sentinel
    Exited(i32),
}

impl Startup {
    /// Outcome for a daemon found dead before any sentinel was seen.
    ///
    /// `late_event` is whatever the log gained on the daemon's way out. A
    /// ready line written by a process that is already gone still means it
    /// exited.
    pub(crate) fn after_exit(pid: i32, late_event: Option<LogEvent>) -> Startup {
        match late_event {
            Some(LogEvent::BindFailed) => Startup::PortInUse,
            Some(LogEvent::Ready) | None => Startup::Exited(pid),
        }
    }
}

/// How long to wait for bootstrap output once the bootstrap has exited.
const PIPE_GRACE: Duration = Duration::from_millis(200);

/// Launches the server and blocks until it is ready or has failed.
pub struct ProcessSupervisor {
    binary: PathBuf,
    extra_args: Vec<String>,
    resilience: ResilienceSettings,
    diagnostics: Diagnostics,
}

impl ProcessSupervisor {
    pub fn new(config: &FixtureConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            binary: config.server.binary.clone(),
            extra_args: config.server.extra_args.clone(),
            resilience: config.resilience.clone(),
            diagnostics: Diagnostics::new(sink),
        }
    }

    /// Start the server for `session` and wait for readiness.
    ///
    /// On success the session is `Ready` and carries the daemon's process id.
    /// On any error it is `Failed`; the caller still owes it a teardown.
    pub fn launch(&self, session: &mut Session) -> Result<()> {
        match self.try_launch(session) {
            Ok(pid) => {
                session.set_process_id(pid);
                session.set_state(SessionState::Ready);
                self.diagnostics.info(format!(
                    "Server ready on port {} (pid {pid})",
                    session.port()
                ));
                Ok(())
            }
            Err(e) => {
                session.set_state(SessionState::Failed);
                self.diagnostics
                    .error(format!("Server on port {} failed: {e}", session.port()));
                Err(e)
            }
        }
    }

    fn try_launch(&self, session: &Session) -> Result<i32> {
        // A stale log would be scanned from its beginning and could carry an
        // old sentinel, and a stale PID file would name a dead process.
        remove_if_exists(session.log_path())?;
        let pid_file = PidFile::new(session.pid_file_path());
        pid_file.remove_stale()?;

        let command = ServerCommand::new(
            &self.binary,
            session.storage_path(),
            session.pid_file_path(),
            session.log_path(),
            session.port(),
        )
        .with_extra_args(&self.extra_args);

        self.diagnostics.debug(format!("Launching: {command}"));

        let started = Instant::now();
        let mut bootstrap = command
            .to_command()
            .spawn()
            .map_err(|source| FixtureError::Spawn {
                binary: self.binary.clone(),
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        // A daemon that inherits these pipes can hold them open for its
        // whole life, so they are drained off-thread and never waited on.
        let stdout = drain_pipe(bootstrap.stdout.take());
        let stderr = drain_pipe(bootstrap.stderr.take());

        let exited = poll_until(
            self.resilience.startup_timeout(),
            Backoff::from_settings(&self.resilience),
            || {
                Ok(match bootstrap.try_wait()? {
                    Some(status) => Probe::Done(status),
                    None => Probe::Pending,
                })
            },
        )?;

        let Some(status) = exited else {
            self.diagnostics.warn(format!(
                "Server bootstrap {} did not exit within {}s, killing it",
                bootstrap.id(),
                self.resilience.startup_timeout_secs
            ));
            if let Err(e) = bootstrap.kill() {
                self.diagnostics
                    .warn(format!("Could not kill server bootstrap: {e}"));
            }
            let _ = bootstrap.wait();

            return Err(FixtureError::StartupTimeout {
                timeout_secs: self.resilience.startup_timeout_secs,
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let stdout = self.collect_pipe("stdout", &stdout);
        if !stdout.trim().is_empty() {
            self.diagnostics
                .debug(format!("Server bootstrap output: {}", stdout.trim()));
        }

        if !status.success() {
            return Err(FixtureError::Launch {
                code: status.code(),
                stderr: self.collect_pipe("stderr", &stderr).trim().to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.diagnostics
            .info(format!("Server running on port {}", session.port()));

        let remaining = self
            .resilience
            .startup_timeout()
            .saturating_sub(started.elapsed());

        match self.wait_for_startup(session, &pid_file, remaining)? {
            Some(Startup::Ready(pid)) => Ok(pid),
            Some(Startup::PortInUse) => Err(FixtureError::PortInUse {
                port: session.port(),
                location: ErrorLocation::from(Location::caller()),
            }),
            Some(Startup::Exited(pid)) => Err(FixtureError::Launch {
                code: None,
                stderr: format!("server process {pid} exited before accepting connections"),
                location: ErrorLocation::from(Location::caller()),
            }),
            None => Err(FixtureError::StartupTimeout {
                timeout_secs: self.resilience.startup_timeout_secs,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Output of an exited bootstrap, or nothing if a background process
    /// still holds the pipe.
    fn collect_pipe(&self, name: &str, pipe: &Receiver<Vec<u8>>) -> String {
        match pipe.recv_timeout(PIPE_GRACE) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(RecvTimeoutError::Timeout) => {
                self.diagnostics.debug(format!(
                    "Server bootstrap {name} still held open by a background process"
                ));
                String::new()
            }
            Err(RecvTimeoutError::Disconnected) => String::new(),
        }
    }

    /// Follow the log until a sentinel settles the outcome.
    ///
    /// A ready sentinel is not enough on its own: the PID file must name the
    /// daemon too, since teardown relies on it. After a bind failure the
    /// daemon cleans up after itself, so the wait continues until its PID file
    /// is gone and teardown has nothing left to signal.
    fn wait_for_startup(
        &self,
        session: &Session,
        pid_file: &PidFile,
        timeout: Duration,
    ) -> Result<Option<Startup>> {
        let mut tail = LogTail::new(session.log_path());
        let mut event: Option<LogEvent> = None;

        poll_until(
            timeout,
            Backoff::from_settings(&self.resilience),
            || {
                if event.is_none() {
                    event = tail.next_event()?;

                    if event == Some(LogEvent::BindFailed) {
                        self.diagnostics.warn(format!(
                            "Port {} is already bound, waiting for the server to clean up",
                            session.port()
                        ));
                    }
                }

                match event {
                    Some(LogEvent::Ready) => Ok(match read_pid_lenient(pid_file)? {
                        Some(pid) => Probe::Done(Startup::Ready(pid)),
                        None => Probe::Pending,
                    }),
                    Some(LogEvent::BindFailed) => Ok(if pid_file.exists() {
                        Probe::Pending
                    } else {
                        Probe::Done(Startup::PortInUse)
                    }),
                    None => Ok(match read_pid_lenient(pid_file)? {
                        Some(pid) if !is_process_running(pid) => {
                            Probe::Done(Startup::after_exit(pid, tail.next_event()?))
                        }
                        _ => Probe::Pending,
                    }),
                }
            },
        )
    }
}

/// Read a child pipe to its end on a helper thread.
fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }
    rx
}

/// A PID file that is missing or still being written reads as `None`.
fn read_pid_lenient(pid_file: &PidFile) -> Result<Option<i32>> {
    match pid_file.read_pid() {
        Ok(pid) => Ok(pid),
        Err(FixtureError::PidFileInvalid { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
