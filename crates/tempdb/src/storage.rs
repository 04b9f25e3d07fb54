//! Scratch storage allocation and release.

use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::{FixtureError, Result};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use error_location::ErrorLocation;
use tempdb_config::StorageSettings;
use tempfile::TempDir;

/// How a session's data directory came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    /// The scratch root itself, empty at allocation
    Scratch,
    /// A copy of `source` inside the scratch root
    Seeded { source: PathBuf },
    /// A caller-owned directory that is never deleted
    Explicit,
}

/// Storage backing one session.
///
/// A scratch root is always allocated: it holds the server log and PID file,
/// and for non-explicit storage also the data itself. Releasing removes the
/// scratch root recursively; an explicit data directory lies outside it and
/// survives.
#[derive(Debug)]
pub struct Storage {
    scratch: TempDir,
    data_path: PathBuf,
    kind: StorageKind,
}

impl Storage {
    /// Directory the server is told to keep its data in.
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Scratch directory owned by the fixture.
    pub fn scratch_root(&self) -> &Path {
        self.scratch.path()
    }

    pub fn kind(&self) -> &StorageKind {
        &self.kind
    }

    pub fn is_caller_owned(&self) -> bool {
        self.kind == StorageKind::Explicit
    }

    /// Give up ownership without deleting anything.
    pub(crate) fn leak(self) -> PathBuf {
        self.scratch.keep()
    }
}

pub struct StorageProvisioner {
    seed_subdirectory: String,
    scratch_prefix: String,
    scratch_parent: Option<PathBuf>,
    diagnostics: Diagnostics,
}

impl StorageProvisioner {
    pub fn new(settings: &StorageSettings, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            seed_subdirectory: settings.seed_subdirectory.clone(),
            scratch_prefix: settings.scratch_prefix.clone(),
            scratch_parent: settings.scratch_parent.clone(),
            diagnostics: Diagnostics::new(sink),
        }
    }

    /// Allocate storage for a new session.
    ///
    /// At most one of `seed_directory` and `explicit_path` may be given.
    pub fn acquire(
        &self,
        seed_directory: Option<&Path>,
        explicit_path: Option<&Path>,
    ) -> Result<Storage> {
        if let (Some(seed), Some(explicit)) = (seed_directory, explicit_path) {
            return Err(FixtureError::configuration(format!(
                "cannot add data from {} to existing path {}",
                seed.display(),
                explicit.display()
            )));
        }

        let scratch = self.allocate_scratch()?;

        let storage = match (seed_directory, explicit_path) {
            (Some(seed), _) => {
                let data_path = scratch.path().join(&self.seed_subdirectory);
                copy_tree(seed, &data_path).map_err(|source| FixtureError::SeedCopy {
                    from: seed.to_path_buf(),
                    to: data_path.clone(),
                    source,
                    location: ErrorLocation::from(Location::caller()),
                })?;
                self.diagnostics.debug(format!(
                    "Copied seed data {} into {}",
                    seed.display(),
                    data_path.display()
                ));

                Storage {
                    scratch,
                    data_path,
                    kind: StorageKind::Seeded {
                        source: seed.to_path_buf(),
                    },
                }
            }
            (None, Some(explicit)) => Storage {
                scratch,
                data_path: explicit.to_path_buf(),
                kind: StorageKind::Explicit,
            },
            (None, None) => Storage {
                data_path: scratch.path().to_path_buf(),
                scratch,
                kind: StorageKind::Scratch,
            },
        };

        Ok(storage)
    }

    /// Recursively remove the scratch root. Caller-owned data is left alone.
    pub fn release(&self, storage: Storage) -> Result<()> {
        let root = storage.scratch_root().to_path_buf();

        if storage.is_caller_owned() {
            self.diagnostics.debug(format!(
                "Leaving caller-owned storage {} in place",
                storage.data_path().display()
            ));
        }

        storage
            .scratch
            .close()
            .map_err(|source| FixtureError::StorageRelease {
                path: root.clone(),
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        self.diagnostics
            .debug(format!("Removed scratch storage {}", root.display()));

        Ok(())
    }

    fn allocate_scratch(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.scratch_prefix);

        let scratch = match &self.scratch_parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };

        scratch.map_err(|source| FixtureError::StorageAllocation {
            source,
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// Copy `src` and everything below it to `dst`, creating `dst`.
///
/// Symlinks are recreated rather than followed.
fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            copy_tree(&src_path, &dst_path)?;
        } else if file_type.is_symlink() {
            let target = std::fs::read_link(&src_path)?;
            std::os::unix::fs::symlink(target, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
