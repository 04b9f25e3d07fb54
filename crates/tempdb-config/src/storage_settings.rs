use crate::{ConfigError, ConfigErrorResult, DEFAULT_SCRATCH_PREFIX, DEFAULT_SEED_SUBDIRECTORY};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the server keeps its data.
///
/// At most one of `data_directory` and `path` may be set:
/// - `data_directory`: copied into a fresh scratch directory, the original is never touched
/// - `path`: used in place and never deleted
/// - neither: an empty scratch directory is used
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_directory: Option<PathBuf>,
    pub path: Option<PathBuf>,
    /// Subdirectory of the scratch root that a seeded copy is placed in
    pub seed_subdirectory: String,
    /// Prefix for scratch directory names
    pub scratch_prefix: String,
    /// Directory scratch roots are created in (system temp dir when unset)
    pub scratch_parent: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_directory: None,
            path: None,
            seed_subdirectory: String::from(DEFAULT_SEED_SUBDIRECTORY),
            scratch_prefix: String::from(DEFAULT_SCRATCH_PREFIX),
            scratch_parent: None,
        }
    }
}

impl StorageSettings {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if let (Some(data_directory), Some(path)) = (&self.data_directory, &self.path) {
            return Err(ConfigError::storage(format!(
                "cannot seed {} into explicit path {}: data_directory and path are mutually exclusive",
                data_directory.display(),
                path.display()
            )));
        }

        if let Some(data_directory) = &self.data_directory
            && !data_directory.is_dir()
        {
            return Err(ConfigError::storage(format!(
                "storage.data_directory {} is not an existing directory",
                data_directory.display()
            )));
        }

        if let Some(parent) = &self.scratch_parent
            && !parent.is_dir()
        {
            return Err(ConfigError::storage(format!(
                "storage.scratch_parent {} is not an existing directory",
                parent.display()
            )));
        }

        if self.seed_subdirectory.is_empty()
            || self.seed_subdirectory.contains('/')
            || self.seed_subdirectory == ".."
        {
            return Err(ConfigError::storage(format!(
                "storage.seed_subdirectory must be a plain directory name, got '{}'",
                self.seed_subdirectory
            )));
        }

        Ok(())
    }
}
