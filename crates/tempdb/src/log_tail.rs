//! Incremental reader for the server's append-only log.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Substring of the line the server logs once it accepts client connections.
pub const READY_SENTINEL: &str = "Listening for client driver";

/// Substring of the line the server logs when the driver port is taken.
pub const BIND_FAILED_SENTINEL: &str = "error: TCP socket creation failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    Ready,
    BindFailed,
}

impl LogEvent {
    pub fn classify(line: &str) -> Option<LogEvent> {
        if line.contains(READY_SENTINEL) {
            Some(LogEvent::Ready)
        } else if line.contains(BIND_FAILED_SENTINEL) {
            Some(LogEvent::BindFailed)
        } else {
            None
        }
    }
}

/// Follows a log file that may not exist yet.
///
/// Every byte is read once: each call resumes where the previous one
/// stopped. A trailing line without its newline is held back until the
/// newline arrives.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    file: Option<File>,
    pending: Vec<u8>,
    consumed: u64,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            pending: Vec::new(),
            consumed: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of complete lines handed out so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Complete lines appended since the last call.
    pub fn read_new_lines(&mut self) -> std::io::Result<Vec<String>> {
        if self.file.is_none() {
            match File::open(&self.path) {
                Ok(file) => self.file = Some(file),
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e),
            }
        }

        if let Some(file) = self.file.as_mut() {
            file.read_to_end(&mut self.pending)?;
        }

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.pending[start..end]);
            lines.push(line.trim_end_matches('\r').to_string());
            start = end + 1;
        }

        self.pending.drain(..start);
        self.consumed += start as u64;

        Ok(lines)
    }

    /// First sentinel among the newly appended lines, if any.
    pub fn next_event(&mut self) -> std::io::Result<Option<LogEvent>> {
        Ok(self
            .read_new_lines()?
            .iter()
            .find_map(|line| LogEvent::classify(line)))
    }
}
