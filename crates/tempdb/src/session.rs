use crate::{SessionState, Storage};

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One provisioned server instance bound to a storage directory and a port.
///
/// Only the supervisor (startup) and the shutdown coordinator (teardown)
/// change its state.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    storage_path: PathBuf,
    port: u16,
    log_path: PathBuf,
    pid_file_path: PathBuf,
    state: SessionState,
    process_id: Option<i32>,
    started_at: DateTime<Utc>,
}

/// Serializable snapshot of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub port: u16,
    pub state: SessionState,
    pub pid: Option<i32>,
    pub storage_path: PathBuf,
    pub log_path: PathBuf,
    pub pid_file_path: PathBuf,
    pub started_at: String,
}

impl Session {
    /// Create a session in the `Starting` state.
    ///
    /// The log and PID files live in the storage's scratch root, never in the
    /// data directory itself.
    pub fn new(storage: &Storage, port: u16, log_file_name: &str, pid_file_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            storage_path: storage.data_path().to_path_buf(),
            port,
            log_path: storage.scratch_root().join(log_file_name),
            pid_file_path: storage.scratch_root().join(pid_file_name),
            state: SessionState::Starting,
            process_id: None,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn pid_file_path(&self) -> &Path {
        &self.pid_file_path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Daemon process id, as read from the PID file.
    pub fn process_id(&self) -> Option<i32> {
        self.process_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Loopback address of the client driver port.
    pub fn driver_address(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, self.port))
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            port: self.port,
            state: self.state,
            pid: self.process_id,
            storage_path: self.storage_path.clone(),
            log_path: self.log_path.clone(),
            pid_file_path: self.pid_file_path.clone(),
            started_at: self.started_at.to_rfc3339(),
        }
    }

    pub(crate) fn set_state(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid session transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    pub(crate) fn set_process_id(&mut self, pid: i32) {
        self.process_id = Some(pid);
    }
}
