//! Race-free server termination.

use crate::backoff::{Backoff, Probe, poll_until};
use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::pid_file::{PidFile, is_process_running};
use crate::{FixtureError, Result, Session, SessionState};

use std::panic::Location;
use std::sync::Arc;

use error_location::ErrorLocation;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tempdb_config::{FixtureConfig, ResilienceSettings};

/// Stops a session's server and confirms the process is gone.
///
/// A session only reaches `Stopped` once the OS no longer reports its
/// process; storage may be released after that and never before.
pub struct ShutdownCoordinator {
    resilience: ResilienceSettings,
    diagnostics: Diagnostics,
}

impl ShutdownCoordinator {
    pub fn new(config: &FixtureConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            resilience: config.resilience.clone(),
            diagnostics: Diagnostics::new(sink),
        }
    }

    /// Terminate the server behind `session`.
    ///
    /// Safe to call again after it returned an error; a `Stopped` session is
    /// left alone.
    pub fn stop(&self, session: &mut Session) -> Result<()> {
        match session.state() {
            SessionState::Stopped => return Ok(()),
            SessionState::Stopping => {}
            SessionState::Starting => {
                session.set_state(SessionState::Failed);
                session.set_state(SessionState::Stopping);
            }
            SessionState::Ready | SessionState::Failed => {
                session.set_state(SessionState::Stopping);
            }
        }

        let pid_file = PidFile::new(session.pid_file_path());

        // Only try to stop the process if it announced itself.
        if !pid_file.exists() {
            self.diagnostics.info(format!(
                "No server running on port {} (no PID file)",
                session.port()
            ));
            session.set_state(SessionState::Stopped);
            return Ok(());
        }

        let Some(pid) = self.read_pid(&pid_file)? else {
            // Removed between the existence check and the read.
            self.diagnostics
                .info(format!("No server running on port {}", session.port()));
            session.set_state(SessionState::Stopped);
            return Ok(());
        };

        if let Some(known) = session.process_id()
            && known != pid
        {
            self.diagnostics.warn(format!(
                "PID file names process {pid}, session started with {known}"
            ));
        }
        session.set_process_id(pid);

        self.diagnostics.info(format!("Sending SIGTERM to pid {pid}"));
        if let Err(source) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
            self.diagnostics
                .error(format!("Could not kill process {pid}: {source}"));

            if source == Errno::ESRCH {
                // Nothing left to wait for; storage can go, but the stale
                // PID file still gets reported.
                session.set_state(SessionState::Stopped);
            }

            return Err(FixtureError::Termination {
                pid,
                source,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.wait_for_exit(pid)? {
            self.diagnostics.info(format!("Server process {pid} ended"));
            session.set_state(SessionState::Stopped);
            return Ok(());
        }

        if self.resilience.force_kill_on_timeout {
            self.diagnostics.warn(format!(
                "Server process {pid} ignored SIGTERM for {}s, sending SIGKILL",
                self.resilience.shutdown_timeout_secs
            ));

            match kill(Pid::from_raw(pid), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(source) => {
                    return Err(FixtureError::Termination {
                        pid,
                        source,
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }

            if self.wait_for_exit(pid)? {
                self.diagnostics
                    .info(format!("Server process {pid} killed"));
                session.set_state(SessionState::Stopped);
                return Ok(());
            }
        }

        Err(FixtureError::ShutdownTimeout {
            pid,
            timeout_secs: self.resilience.shutdown_timeout_secs,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Read the PID, allowing the server a moment to finish writing it.
    fn read_pid(&self, pid_file: &PidFile) -> Result<Option<i32>> {
        let mut last_invalid = None;

        let outcome = poll_until(
            self.resilience.shutdown_timeout(),
            Backoff::from_settings(&self.resilience),
            || match pid_file.read_pid() {
                Ok(pid) => Ok(Probe::Done(pid)),
                Err(e @ FixtureError::PidFileInvalid { .. }) => {
                    last_invalid = Some(e);
                    Ok(Probe::Pending)
                }
                Err(e) => Err(e),
            },
        )?;

        match (outcome, last_invalid) {
            (Some(pid), _) => Ok(pid),
            (None, Some(invalid)) => Err(invalid),
            (None, None) => Ok(None),
        }
    }

    /// Wait until the OS stops reporting `pid`. `false` on timeout.
    fn wait_for_exit(&self, pid: i32) -> Result<bool> {
        let gone = poll_until(
            self.resilience.shutdown_timeout(),
            Backoff::from_settings(&self.resilience),
            || {
                Ok(if is_process_running(pid) {
                    Probe::Pending
                } else {
                    Probe::Done(())
                })
            },
        )?;

        Ok(gone.is_some())
    }
}
