use crate::{FixtureError, Result};

use std::panic::Location;
use std::path::{Path, PathBuf};

use error_location::ErrorLocation;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// PID file written by the daemonized server.
///
/// Presence means the server intends to run or is running; disappearance
/// after having existed means it has fully exited.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the process id.
    ///
    /// Returns `Ok(None)` when the file does not exist and
    /// `PidFileInvalid` when it exists but holds no number (including the
    /// moment between the server creating and writing it).
    pub fn read_pid(&self) -> Result<Option<i32>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match contents.trim().parse::<i32>() {
            Ok(pid) if pid > 0 => Ok(Some(pid)),
            _ => Err(FixtureError::PidFileInvalid {
                path: self.path.clone(),
                contents,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Delete a file left over from an earlier run. Missing files are fine.
    pub fn remove_stale(&self) -> Result<()> {
        remove_if_exists(&self.path)
    }
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Check if a process with the given PID is currently running.
///
/// Uses `kill(pid, 0)`, which checks existence without sending a signal.
/// `EPERM` means the process exists but belongs to someone else. Zombies
/// count as gone: under an init that never reaps, an exited daemon would
/// otherwise look alive forever.
pub fn is_process_running(pid: i32) -> bool {
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => !is_zombie(pid),
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: i32) -> bool {
    // Field 3 of /proc/<pid>/stat, after the parenthesised command name.
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            stat.rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next().map(|s| s == "Z"))
        })
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: i32) -> bool {
    false
}
