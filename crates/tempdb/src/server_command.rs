use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Command line that boots the server as a daemon.
///
/// `<binary> --no-http-admin --no-update-check --daemon --directory <data>
/// --pid-file <pid> --driver-port <port> --log-file <log> [extra args]`
#[derive(Debug, Clone)]
pub struct ServerCommand {
    binary: PathBuf,
    data_path: PathBuf,
    pid_file: PathBuf,
    log_file: PathBuf,
    port: u16,
    extra_args: Vec<String>,
}

impl ServerCommand {
    pub fn new(
        binary: impl Into<PathBuf>,
        data_path: impl Into<PathBuf>,
        pid_file: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
        port: u16,
    ) -> Self {
        Self {
            binary: binary.into(),
            data_path: data_path.into(),
            pid_file: pid_file.into(),
            log_file: log_file.into(),
            port,
            extra_args: Vec::new(),
        }
    }

    pub fn with_extra_args(mut self, extra_args: &[String]) -> Self {
        self.extra_args = extra_args.to_vec();
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--no-http-admin".into(),
            "--no-update-check".into(),
            "--daemon".into(),
            "--directory".into(),
            self.data_path.clone().into_os_string(),
            "--pid-file".into(),
            self.pid_file.clone().into_os_string(),
            "--driver-port".into(),
            self.port.to_string().into(),
            "--log-file".into(),
            self.log_file.clone().into_os_string(),
        ];
        args.extend(self.extra_args.iter().map(OsString::from));
        args
    }

    /// Process builder for the bootstrap process.
    ///
    /// Output is piped so the server's start-up chatter never reaches the
    /// caller's own stdout. The daemon may inherit both pipes, so readers
    /// must not wait for them to close.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl fmt::Display for ServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary.display())?;
        for arg in self.args() {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
