//! Injected diagnostic sinks.
//!
//! Fixture code never writes to a process-wide logger directly; it reports
//! through a [`DiagnosticSink`] handed in by the caller. [`LogSink`] forwards
//! to the `log` facade under a caller-chosen target.

use std::sync::{Arc, Mutex};

use log::Level;

/// Receives lifecycle diagnostics from a fixture.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, level: Level, message: &str);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Clone)]
pub struct LogSink {
    target: String,
}

impl LogSink {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl DiagnosticSink for LogSink {
    fn record(&self, level: Level, message: &str) {
        log::log!(target: self.target.as_str(), level, "{message}");
    }
}

/// Keeps every record in memory. Handy for asserting on fixture behaviour.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Whether any record contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|(_, message)| message.contains(needle))
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, level: Level, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push((level, message.to_string()));
        }
    }
}

#[derive(Clone)]
pub(crate) struct Diagnostics {
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostics {
    pub(crate) fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn debug(&self, message: impl AsRef<str>) {
        self.sink.record(Level::Debug, message.as_ref());
    }

    pub(crate) fn info(&self, message: impl AsRef<str>) {
        self.sink.record(Level::Info, message.as_ref());
    }

    pub(crate) fn warn(&self, message: impl AsRef<str>) {
        self.sink.record(Level::Warn, message.as_ref());
    }

    pub(crate) fn error(&self, message: impl AsRef<str>) {
        self.sink.record(Level::Error, message.as_ref());
    }
}
