use crate::{ConfigError, ConfigErrorResult, DEFAULT_LOG_TARGET, LogLevel};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level used by the CLI logger (library code never installs a logger)
    pub level: LogLevel,
    /// `log` target that fixture diagnostics are routed to
    pub target: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            target: String::from(DEFAULT_LOG_TARGET),
        }
    }
}

impl LoggingSettings {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.target.trim().is_empty() {
            return Err(ConfigError::logging("logging.target must not be empty"));
        }

        Ok(())
    }
}
