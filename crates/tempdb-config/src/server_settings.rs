use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_LOG_FILE_NAME, DEFAULT_PID_FILE_NAME, DEFAULT_PORT,
    DEFAULT_SERVER_BINARY,
};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server executable, resolved through PATH when not absolute
    pub binary: PathBuf,
    /// Client driver port handed to the server
    pub port: u16,
    /// Name of the server log file inside the scratch directory
    pub log_file_name: String,
    /// Name of the PID file inside the scratch directory
    pub pid_file_name: String,
    /// Additional flags appended after the fixed launch flags
    pub extra_args: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_SERVER_BINARY),
            port: DEFAULT_PORT,
            log_file_name: String::from(DEFAULT_LOG_FILE_NAME),
            pid_file_name: String::from(DEFAULT_PID_FILE_NAME),
            extra_args: Vec::new(),
        }
    }
}

impl ServerSettings {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(ConfigError::server("server.binary must not be empty"));
        }

        // The server has to be told a concrete port; it never reports back an
        // OS-assigned one.
        if self.port == 0 {
            return Err(ConfigError::server("server.port must be non-zero"));
        }

        Self::validate_file_name("server.log_file_name", &self.log_file_name)?;
        Self::validate_file_name("server.pid_file_name", &self.pid_file_name)?;

        if self.log_file_name == self.pid_file_name {
            return Err(ConfigError::server(format!(
                "server.log_file_name and server.pid_file_name must differ, both are '{}'",
                self.log_file_name
            )));
        }

        Ok(())
    }

    fn validate_file_name(field: &str, name: &str) -> ConfigErrorResult<()> {
        if name.is_empty() {
            return Err(ConfigError::server(format!("{field} must not be empty")));
        }

        if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') || name == ".." {
            return Err(ConfigError::server(format!(
                "{field} must be a plain file name, got '{name}'"
            )));
        }

        Ok(())
    }
}
