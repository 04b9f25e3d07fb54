use crate::error::{CliError, CliResult};

use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::debug;
use tempdb_config::LogLevel;

/// Initialize logger with fern.
///
/// Logs go to stderr so that stdout carries only the JSON result.
///
/// # Arguments
/// * `log_level` - Log level filter
/// * `colored` - Enable colored level names
pub fn initialize(log_level: LogLevel, colored: bool) -> CliResult<()> {
    let level_filter = log_level.0;

    let dispatch = if colored {
        let colors = ColoredLevelConfig::new()
            .trace(Color::Magenta)
            .debug(Color::Blue)
            .info(Color::Green)
            .warn(Color::Yellow)
            .error(Color::Red);

        Dispatch::new().format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{target}]",
                date = humantime::format_rfc3339_seconds(SystemTime::now()),
                level = colors.color(record.level()),
                message = message,
                target = record.target(),
            ))
        })
    } else {
        Dispatch::new().format(|out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{target}]",
                date = humantime::format_rfc3339_seconds(SystemTime::now()),
                level = record.level(),
                message = message,
                target = record.target(),
            ))
        })
    };

    Dispatch::new()
        .level(level_filter)
        .chain(dispatch.chain(std::io::stderr()))
        .apply()
        .map_err(|e| CliError::logger(e.to_string()))?;

    debug!("Logger initialized: level={level_filter:?}, stderr");

    Ok(())
}
