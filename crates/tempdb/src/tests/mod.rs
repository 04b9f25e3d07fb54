mod shutdown;
mod storage;

use crate::MemorySink;

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempdb_config::FixtureConfig;

/// Config with short timeouts whose scratch roots land in `scratch_parent`.
pub(crate) fn fast_config(scratch_parent: &Path) -> FixtureConfig {
    let mut config = FixtureConfig::default()
        .with_scratch_parent(scratch_parent)
        .with_startup_timeout_secs(2)
        .with_shutdown_timeout_secs(2);
    config.resilience.initial_backoff_ms = 5;
    config.resilience.max_backoff_ms = 50;
    config
}

pub(crate) fn memory_sink() -> Arc<MemorySink> {
    Arc::new(MemorySink::new())
}

/// Run `script` under `sh` with `pid_path` as `$1`, reaping it on exit.
///
/// The script is expected to write its own PID to `$1` once it is set up;
/// this waits for that before returning the PID.
pub(crate) fn spawn_scripted(script: &str, pid_path: &Path) -> i32 {
    let child = Command::new("sh")
        .args(["-c", script, "sh"])
        .arg(pid_path)
        .spawn()
        .unwrap();

    std::thread::spawn(move || {
        let mut child = child;
        let _ = child.wait();
    });

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(contents) = std::fs::read_to_string(pid_path)
            && let Ok(pid) = contents.trim().parse::<i32>()
        {
            return pid;
        }
        assert!(Instant::now() < deadline, "script never wrote its PID file");
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// PID of a process that has already exited and been reaped.
pub(crate) fn dead_pid() -> i32 {
    let mut child = Command::new("true").spawn().unwrap();
    let pid = child.id() as i32;
    child.wait().unwrap();
    pid
}

pub(crate) fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}
