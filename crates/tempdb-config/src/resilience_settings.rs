use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS, DEFAULT_STARTUP_TIMEOUT_SECS, MAX_TIMEOUT_SECS,
};

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    /// How long to wait for the readiness sentinel (seconds)
    pub startup_timeout_secs: u64,

    /// How long to wait for the process to exit after a signal (seconds)
    pub shutdown_timeout_secs: u64,

    /// First polling delay (milliseconds), doubled after every miss
    pub initial_backoff_ms: u64,

    /// Upper bound for the polling delay (milliseconds)
    pub max_backoff_ms: u64,

    /// Send SIGKILL when SIGTERM did not end the process in time
    pub force_kill_on_timeout: bool,
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            force_kill_on_timeout: true,
        }
    }
}

impl ResilienceSettings {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.startup_timeout_secs == 0 {
            return Err(ConfigError::resilience(
                "resilience.startup_timeout_secs must be > 0",
            ));
        }

        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::resilience(
                "resilience.shutdown_timeout_secs must be > 0",
            ));
        }

        if self.startup_timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::resilience(format!(
                "resilience.startup_timeout_secs ({}) must not exceed {MAX_TIMEOUT_SECS}",
                self.startup_timeout_secs
            )));
        }

        if self.shutdown_timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::resilience(format!(
                "resilience.shutdown_timeout_secs ({}) must not exceed {MAX_TIMEOUT_SECS}",
                self.shutdown_timeout_secs
            )));
        }

        if self.initial_backoff_ms == 0 {
            return Err(ConfigError::resilience(
                "resilience.initial_backoff_ms must be > 0",
            ));
        }

        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::resilience(format!(
                "resilience.initial_backoff_ms ({}) must not exceed max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }

        Ok(())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}
