#![allow(dead_code)]

mod stub_server;

pub use stub_server::{StubMode, StubServer};

use std::path::Path;
use std::sync::Arc;

use tempdb::MemorySink;

pub fn memory_sink() -> Arc<MemorySink> {
    Arc::new(MemorySink::new())
}

/// Entries directly under `path`.
pub fn entries(path: &Path) -> usize {
    std::fs::read_dir(path).unwrap().count()
}
