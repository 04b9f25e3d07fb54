use crate::{
    ConfigError, ConfigErrorResult, LoggingSettings, ResilienceSettings, ServerSettings,
    StorageSettings,
};

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub storage: StorageSettings,
    pub server: ServerSettings,
    pub resilience: ResilienceSettings,
    pub logging: LoggingSettings,
}

impl FixtureConfig {
    /// Load config from a TOML file, then apply `TEMPDB_*` environment overrides.
    ///
    /// A missing file is not an error: defaults are used instead.
    /// Does NOT validate - call validate() after load().
    pub fn load(path: &Path) -> ConfigErrorResult<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

            toml::from_str(&contents).map_err(|e| ConfigError::Toml {
                path: path.to_path_buf(),
                source: e,
            })?
        } else {
            FixtureConfig::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse a config from TOML text without consulting the environment.
    pub fn from_toml_str(contents: &str) -> ConfigErrorResult<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::Toml {
            path: PathBuf::from("<inline>"),
            source: e,
        })
    }

    pub fn to_toml_string(&self) -> ConfigErrorResult<String> {
        toml::to_string_pretty(self).map_err(|source| ConfigError::TomlSerialize { source })
    }

    /// Validate all settings.
    /// Called by the fixture before any storage is allocated or process spawned.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.storage.validate()?;
        self.server.validate()?;
        self.resilience.validate()?;
        self.logging.validate()?;

        Ok(())
    }

    // === Builders ===

    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.server.binary = binary.into();
        self
    }

    /// Seed the fixture from a copy of an existing data directory.
    pub fn with_data_directory(mut self, data_directory: impl Into<PathBuf>) -> Self {
        self.storage.data_directory = Some(data_directory.into());
        self
    }

    /// Run the server directly against a caller-owned directory.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.path = Some(path.into());
        self
    }

    /// Create scratch directories under `parent` instead of the system temp dir.
    pub fn with_scratch_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.storage.scratch_parent = Some(parent.into());
        self
    }

    /// Route fixture diagnostics to the given `log` target.
    pub fn with_logger(mut self, target: impl Into<String>) -> Self {
        self.logging.target = target.into();
        self
    }

    pub fn with_startup_timeout_secs(mut self, secs: u64) -> Self {
        self.resilience.startup_timeout_secs = secs;
        self
    }

    pub fn with_shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.resilience.shutdown_timeout_secs = secs;
        self
    }

    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.server.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Log configuration summary.
    pub fn log_summary(&self) {
        info!(target: self.logging.target.as_str(), "Fixture configuration:");
        info!(
            target: self.logging.target.as_str(),
            "  server: {} on port {}",
            self.server.binary.display(),
            self.server.port
        );

        let storage = match (&self.storage.data_directory, &self.storage.path) {
            (Some(seed), _) => format!("copy of {}", seed.display()),
            (None, Some(path)) => format!("explicit {}", path.display()),
            (None, None) => String::from("empty scratch directory"),
        };
        info!(target: self.logging.target.as_str(), "  storage: {storage}");

        info!(
            target: self.logging.target.as_str(),
            "  resilience: startup={}s, shutdown={}s, backoff={}ms..{}ms, force_kill={}",
            self.resilience.startup_timeout_secs,
            self.resilience.shutdown_timeout_secs,
            self.resilience.initial_backoff_ms,
            self.resilience.max_backoff_ms,
            self.resilience.force_kill_on_timeout
        );
    }

    pub fn apply_env_overrides(&mut self) {
        // Storage
        Self::apply_env_option_path("TEMPDB_DATA_DIRECTORY", &mut self.storage.data_directory);
        Self::apply_env_option_path("TEMPDB_PATH", &mut self.storage.path);

        // Server
        Self::apply_env_path("TEMPDB_SERVER_BINARY", &mut self.server.binary);
        Self::apply_env_parse("TEMPDB_PORT", &mut self.server.port);

        // Resilience
        Self::apply_env_parse(
            "TEMPDB_STARTUP_TIMEOUT_SECS",
            &mut self.resilience.startup_timeout_secs,
        );
        Self::apply_env_parse(
            "TEMPDB_SHUTDOWN_TIMEOUT_SECS",
            &mut self.resilience.shutdown_timeout_secs,
        );

        // Logging
        Self::apply_env_parse("TEMPDB_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_string("TEMPDB_LOG_TARGET", &mut self.logging.target);
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for PathBuf values
    fn apply_env_path(var_name: &str, target: &mut PathBuf) {
        if let Some(val) = std::env::var_os(var_name) {
            *target = PathBuf::from(val);
        }
    }

    /// Helper: Apply environment variable override for Option<PathBuf> values
    fn apply_env_option_path(var_name: &str, target: &mut Option<PathBuf>) {
        if let Some(val) = std::env::var_os(var_name)
            && !val.is_empty()
        {
            *target = Some(PathBuf::from(val));
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name) {
            match val.parse() {
                Ok(parsed) => *target = parsed,
                Err(_) => warn!("Ignoring {var_name}={val:?}: not a valid value"),
            }
        }
    }
}
