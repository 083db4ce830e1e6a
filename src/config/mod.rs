//! Configuration management.
//!
//! This module handles:
//! - Environment variable loading (a `.env` file is honoured)
//! - Configuration validation
//! - Default value handling
//!
//! Every variable is optional; the defaults open a fresh in-memory store and
//! stamp enrolment dates per inserted row.
//!
//! # Example
//!
//! ```
//! use student_records::config::{Config, EnrolledDefault, DEFAULT_DATABASE_URL};
//!
//! let config = Config::default();
//! assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
//! assert_eq!(config.enrolled_default, EnrolledDefault::PerRow);
//! ```

mod validation;

pub use validation::{is_memory_url, validate_config};

use crate::error::ConfigError;

/// Default database URL: a private memory-resident `SQLite` database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// How a missing `enrolled_date` is filled in on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnrolledDefault {
    /// Read the clock once per inserted row.
    #[default]
    PerRow,
    /// Read the clock once when the store opens and reuse that instant for
    /// every row.
    Shared,
}

impl EnrolledDefault {
    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PerRow => "per_row",
            Self::Shared => "shared",
        }
    }

    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "per_row" => Some(Self::PerRow),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }
}

/// Application configuration.
///
/// Use [`Config::from_env`] to load configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `SQLite` connection URL; must be memory-resident.
    pub database_url: String,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: String,
    /// Enrolment timestamp policy.
    pub enrolled_default: EnrolledDefault,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            enrolled_default: EnrolledDefault::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables (with defaults):
    /// - `DATABASE_URL`: memory-resident `SQLite` URL (default: `sqlite::memory:`)
    /// - `LOG_LEVEL`: Logging level (default: `info`)
    /// - `ENROLLED_DEFAULT`: `per_row` or `shared` (default: `per_row`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `ENROLLED_DEFAULT` is not
    /// recognised or any value fails validation (see [`validate_config`]).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into());

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());

        let enrolled_default = match std::env::var("ENROLLED_DEFAULT") {
            Ok(val) => EnrolledDefault::parse(&val).ok_or_else(|| ConfigError::InvalidValue {
                var: "ENROLLED_DEFAULT".into(),
                reason: "must be 'per_row' or 'shared'".into(),
            })?,
            Err(_) => EnrolledDefault::default(),
        };

        let config = Self {
            database_url,
            log_level,
            enrolled_default,
        };

        validate_config(&config)?;
        Ok(config)
    }
}
