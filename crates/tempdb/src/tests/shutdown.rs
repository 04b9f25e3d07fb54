use crate::{FixtureError, Session, SessionState, ShutdownCoordinator, StorageProvisioner};
use crate::{Storage, is_process_running};

use std::sync::Arc;

use googletest::assert_that;
use googletest::prelude::eq;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tempdb_config::FixtureConfig;
use tempfile::TempDir;

use super::{dead_pid, fast_config, memory_sink, spawn_scripted};

const COOPERATIVE: &str = r#"echo $$ > "$1"; exec sleep 30"#;
const IGNORES_TERM: &str = r#"trap '' TERM; echo $$ > "$1"; while :; do sleep 0.1; done"#;

struct Harness {
    _parent: TempDir,
    config: FixtureConfig,
    storage: Storage,
    session: Session,
}

fn harness(configure: impl FnOnce(&mut FixtureConfig)) -> Harness {
    let parent = TempDir::new().unwrap();
    let mut config = fast_config(parent.path());
    configure(&mut config);

    let provisioner = StorageProvisioner::new(&config.storage, memory_sink());
    let storage = provisioner.acquire(None, None).unwrap();
    let session = Session::new(&storage, 28015, "log_file", "pidfile");

    Harness {
        _parent: parent,
        config,
        storage,
        session,
    }
}

#[test]
fn given_no_pid_file_when_stopped_then_stopped_without_signal() {
    let mut h = harness(|_| {});
    let sink = memory_sink();
    let coordinator = ShutdownCoordinator::new(&h.config, sink.clone());

    coordinator.stop(&mut h.session).unwrap();

    assert_that!(h.session.state(), eq(SessionState::Stopped));
    assert!(sink.contains("No server running on port 28015"));
    assert!(!sink.contains("SIGTERM"));
    assert!(h.storage.data_path().is_dir());
}

#[test]
fn given_running_server_when_stopped_then_process_gone_before_stopped() {
    let mut h = harness(|_| {});
    let pid = spawn_scripted(COOPERATIVE, h.session.pid_file_path());
    let sink = memory_sink();
    let coordinator = ShutdownCoordinator::new(&h.config, sink.clone());

    coordinator.stop(&mut h.session).unwrap();

    assert_that!(h.session.state(), eq(SessionState::Stopped));
    assert_eq!(h.session.process_id(), Some(pid));
    assert!(!is_process_running(pid));
    assert!(sink.contains(&format!("Sending SIGTERM to pid {pid}")));
    assert!(sink.contains(&format!("Server process {pid} ended")));
}

#[test]
fn given_stopped_session_when_stopped_again_then_no_op() {
    let mut h = harness(|_| {});
    let pid = spawn_scripted(COOPERATIVE, h.session.pid_file_path());
    let coordinator = ShutdownCoordinator::new(&h.config, memory_sink());
    coordinator.stop(&mut h.session).unwrap();

    let sink = memory_sink();
    let again = ShutdownCoordinator::new(&h.config, sink.clone());
    again.stop(&mut h.session).unwrap();

    assert!(!is_process_running(pid));
    assert!(sink.records().is_empty());
}

#[test]
fn given_stale_pid_file_when_stopped_then_termination_error_and_stopped() {
    let mut h = harness(|_| {});
    let pid = dead_pid();
    std::fs::write(h.session.pid_file_path(), pid.to_string()).unwrap();
    let sink = memory_sink();
    let coordinator = ShutdownCoordinator::new(&h.config, sink.clone());

    let result = coordinator.stop(&mut h.session);

    match result {
        Err(FixtureError::Termination {
            pid: failed,
            source,
            ..
        }) => {
            assert_that!(failed, eq(pid));
            assert_that!(source, eq(Errno::ESRCH));
        }
        other => panic!("expected Termination error, got {other:?}"),
    }
    assert_that!(h.session.state(), eq(SessionState::Stopped));
    assert!(sink.contains(&format!("Could not kill process {pid}")));
}

#[test]
fn given_server_ignoring_sigterm_when_stopped_then_escalates_to_sigkill() {
    let mut h = harness(|config| config.resilience.shutdown_timeout_secs = 1);
    let pid = spawn_scripted(IGNORES_TERM, h.session.pid_file_path());
    let sink = memory_sink();
    let coordinator = ShutdownCoordinator::new(&h.config, sink.clone());

    coordinator.stop(&mut h.session).unwrap();

    assert_that!(h.session.state(), eq(SessionState::Stopped));
    assert!(!is_process_running(pid));
    assert!(sink.contains("sending SIGKILL"));
    assert!(sink.contains(&format!("Server process {pid} killed")));
}

#[test]
fn given_server_ignoring_sigterm_without_escalation_when_stopped_then_timeout() {
    let mut h = harness(|config| {
        config.resilience.shutdown_timeout_secs = 1;
        config.resilience.force_kill_on_timeout = false;
    });
    let pid = spawn_scripted(IGNORES_TERM, h.session.pid_file_path());
    let coordinator = ShutdownCoordinator::new(&h.config, Arc::new(crate::MemorySink::new()));

    let result = coordinator.stop(&mut h.session);

    assert!(matches!(
        result,
        Err(FixtureError::ShutdownTimeout { pid: p, timeout_secs: 1, .. }) if p == pid
    ));
    assert_that!(h.session.state(), eq(SessionState::Stopping));
    assert!(is_process_running(pid));

    kill(Pid::from_raw(pid), Signal::SIGKILL).unwrap();
}

#[test]
fn given_pid_file_never_written_when_stopped_then_invalid_after_timeout() {
    let mut h = harness(|config| config.resilience.shutdown_timeout_secs = 1);
    std::fs::write(h.session.pid_file_path(), "").unwrap();
    let coordinator = ShutdownCoordinator::new(&h.config, memory_sink());

    let result = coordinator.stop(&mut h.session);

    assert!(matches!(result, Err(FixtureError::PidFileInvalid { .. })));
    assert_that!(h.session.state(), eq(SessionState::Stopping));
}
