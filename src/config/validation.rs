//! Configuration validation.
//!
//! Ensures the store stays memory-resident and the log filter is usable.

use super::Config;
use crate::error::ConfigError;

/// Log levels accepted by `LOG_LEVEL`.
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Whether `url` names a memory-resident `SQLite` database.
///
/// Accepts `sqlite::memory:` and `sqlite:` URLs carrying `mode=memory`.
#[must_use]
pub fn is_memory_url(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return false;
    };
    rest == ":memory:"
        || rest
            .split_once('?')
            .is_some_and(|(_, params)| params.split('&').any(|p| p == "mode=memory"))
}

/// Validate configuration values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if:
/// - `DATABASE_URL` is not a memory-resident `SQLite` URL
/// - `LOG_LEVEL` is not one of error, warn, info, debug, trace
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !is_memory_url(&config.database_url) {
        return Err(ConfigError::InvalidValue {
            var: "DATABASE_URL".into(),
            reason: "must be a memory-resident sqlite URL (sqlite::memory: or mode=memory)".into(),
        });
    }

    if !LOG_LEVELS.contains(&config.log_level.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::InvalidValue {
            var: "LOG_LEVEL".into(),
            reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
        });
    }

    Ok(())
}
