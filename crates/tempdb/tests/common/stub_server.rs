use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempdb::FixtureConfig;
use tempfile::TempDir;

/// How the stub daemon behaves once the bootstrap hands off to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubMode {
    /// Binds its port, logs the ready line, exits cleanly on SIGTERM
    Healthy,
    /// The bootstrap prints to stderr and exits 1 without daemonizing
    BootstrapFails,
    /// Writes its PID file but never logs the ready line
    NeverReady,
    /// Ready, but ignores SIGTERM
    IgnoresTerm,
    /// Writes its PID file and exits without logging a sentinel
    DiesEarly,
    /// The bootstrap never exits
    BootstrapHangs,
    /// Healthy, but the bootstrap leaves a background child holding its output pipes
    LeaksOutput,
}

impl StubMode {
    fn as_str(self) -> &'static str {
        match self {
            StubMode::Healthy => "healthy",
            StubMode::BootstrapFails => "bootstrap-fails",
            StubMode::NeverReady => "never-ready",
            StubMode::IgnoresTerm => "ignores-term",
            StubMode::DiesEarly => "dies-early",
            StubMode::BootstrapHangs => "bootstrap-hangs",
            StubMode::LeaksOutput => "leaks-output",
        }
    }
}

/// Daemonizing shell-script stand-in for the database server.
///
/// Accepts the real server's command line. Ports are "bound" by creating a
/// marker directory, so two stubs sharing a `StubServer` collide the way two
/// servers on one port would.
pub struct StubServer {
    dir: TempDir,
    binary: PathBuf,
}

const BOOTSTRAP: &str = r#"#!/bin/sh
MODE="@MODE@"
STUB_DIR="@STUB_DIR@"

printf '%s\n' "$*" >> "$STUB_DIR/invocations"

while [ $# -gt 0 ]; do
    case "$1" in
        --directory) DATA="$2"; shift 2 ;;
        --pid-file) PIDFILE="$2"; shift 2 ;;
        --driver-port) PORT="$2"; shift 2 ;;
        --log-file) LOG="$2"; shift 2 ;;
        *) shift ;;
    esac
done

echo "Initializing directory $DATA"

if [ "$MODE" = "bootstrap-fails" ]; then
    echo "error: could not create directory $DATA" >&2
    exit 1
fi

if [ "$MODE" = "bootstrap-hangs" ]; then
    exec sleep 30
fi

if [ "$MODE" = "leaks-output" ]; then
    sleep 30 &
fi

"$STUB_DIR/daemon" "$DATA" "$PIDFILE" "$PORT" "$LOG" </dev/null >/dev/null 2>&1 &
exit 0
"#;

const DAEMON: &str = r#"#!/bin/sh
MODE="@MODE@"
PORTS="@STUB_DIR@/ports"
DATA="$1"
PIDFILE="$2"
PORT="$3"
LOG="$4"

cleanup() {
    rmdir "$PORTS/$PORT" 2>/dev/null
    rm -f "$PIDFILE"
    exit 0
}

if [ "$MODE" = "ignores-term" ]; then
    trap '' TERM
else
    trap cleanup TERM
fi

echo $$ > "$PIDFILE"
echo "info: Running stub server in $MODE mode" >> "$LOG"

if [ "$MODE" = "dies-early" ]; then
    echo "info: Loading data from directory $DATA" >> "$LOG"
    exit 3
fi

if ! mkdir "$PORTS/$PORT" 2>/dev/null; then
    echo "error: TCP socket creation failed for port $PORT: Address already in use" >> "$LOG"
    sleep 0.2
    rm -f "$PIDFILE"
    exit 1
fi

mkdir -p "$DATA"
echo "stub" > "$DATA/metadata"

if [ "$MODE" != "never-ready" ]; then
    echo "info: Listening for client driver connections on port $PORT" >> "$LOG"
fi

while :; do
    sleep 0.05
done
"#;

impl StubServer {
    pub fn install(mode: StubMode) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("ports")).unwrap();

        let render = |template: &str| {
            template
                .replace("@MODE@", mode.as_str())
                .replace("@STUB_DIR@", &dir.path().display().to_string())
        };

        let binary = dir.path().join("server");
        write_executable(&binary, &render(BOOTSTRAP));
        write_executable(&dir.path().join("daemon"), &render(DAEMON));

        Self { dir, binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Argument lines of every bootstrap invocation so far.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("invocations"))
            .map(|contents| contents.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Fast-polling config that runs this stub with scratch under `scratch_parent`.
    pub fn config(&self, scratch_parent: &Path, port: u16) -> FixtureConfig {
        let mut config = FixtureConfig::default()
            .with_binary(&self.binary)
            .with_port(port)
            .with_scratch_parent(scratch_parent)
            .with_startup_timeout_secs(5)
            .with_shutdown_timeout_secs(5)
            .with_logger("tempdb.tests");
        config.resilience.initial_backoff_ms = 5;
        config.resilience.max_backoff_ms = 50;
        config
    }
}

fn write_executable(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}
