//! Error types for the student record store.
//!
//! This module defines a hierarchical error system:
//! - [`AppError`]: Top-level errors returned by the demonstration run
//! - [`StorageError`]: Database operation errors
//! - [`ConfigError`]: Configuration errors
//!
//! All errors implement `Send + Sync` for async compatibility.

use thiserror::Error;

/// Top-level application error.
///
/// Wraps every subsystem error so the binary can report a single failure and
/// exit.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Writing results to the output failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Kind of store-enforced constraint that rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// A unique constraint (e.g. `unique_email`).
    Unique,
    /// A check constraint (e.g. `grade_between_1_and_12`).
    Check,
    /// The primary key.
    PrimaryKey,
    /// A `NOT NULL` column.
    NotNull,
    /// Any other constraint reported by the store.
    Other,
}

impl ConstraintKind {
    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Check => "check",
            Self::PrimaryKey => "primary key",
            Self::NotNull => "not null",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage errors.
///
/// These errors represent failures in database operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Failed to connect to the database.
    #[error("Database connection failed: {message}")]
    ConnectionFailed {
        /// Description of the connection failure.
        message: String,
    },

    /// Creating a table or index failed.
    #[error("Schema creation failed for {table}: {message}")]
    SchemaFailed {
        /// The table being created.
        table: String,
        /// Description of the failure.
        message: String,
    },

    /// A write was rejected by a store constraint.
    #[error("Constraint violation ({kind}): {message}")]
    ConstraintViolation {
        /// Which kind of constraint rejected the write.
        kind: ConstraintKind,
        /// Message reported by the store.
        message: String,
    },

    /// A database query failed.
    #[error("Query failed: {query} - {message}")]
    QueryFailed {
        /// The query that failed (may be truncated).
        query: String,
        /// Description of the failure.
        message: String,
    },

    /// The query or update expression cannot be executed.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// Why the query is invalid.
        message: String,
    },

    /// The operation needs a persisted record but got one without an id.
    #[error("Student is not persisted: {email}")]
    Detached {
        /// Email of the detached student.
        email: String,
    },

    /// No row exists for the given id.
    #[error("Student not found: {id}")]
    NotFound {
        /// The id that was not found.
        id: i64,
    },

    /// Internal storage error.
    #[error("Internal storage error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Returns true if this error is a constraint violation.
    #[must_use]
    pub const fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }

    /// Classify a `sqlx` error raised while executing `query`.
    ///
    /// Database errors carrying a constraint kind become
    /// [`StorageError::ConstraintViolation`]; everything else becomes
    /// [`StorageError::QueryFailed`]. The extended `SQLite` code is checked
    /// first, since `sqlx` folds primary-key conflicts into
    /// `ErrorKind::UniqueViolation`.
    pub(crate) fn from_sqlx(query: &str, err: &sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = err {
            let code = db_err.code();
            let kind = classify_sqlite_code(code.as_deref()).or_else(|| match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
                sqlx::error::ErrorKind::CheckViolation => Some(ConstraintKind::Check),
                sqlx::error::ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
                sqlx::error::ErrorKind::ForeignKeyViolation => Some(ConstraintKind::Other),
                _ => None,
            });
            if let Some(kind) = kind {
                return Self::ConstraintViolation {
                    kind,
                    message: db_err.message().to_string(),
                };
            }
        }

        Self::QueryFailed {
            query: query.to_string(),
            message: err.to_string(),
        }
    }
}

/// Map an extended `SQLite` result code to a constraint kind.
fn classify_sqlite_code(code: Option<&str>) -> Option<ConstraintKind> {
    match code? {
        // SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_ROWID
        "1555" | "2579" => Some(ConstraintKind::PrimaryKey),
        // SQLITE_CONSTRAINT_UNIQUE
        "2067" => Some(ConstraintKind::Unique),
        // SQLITE_CONSTRAINT_CHECK
        "275" => Some(ConstraintKind::Check),
        // SQLITE_CONSTRAINT_NOTNULL
        "1299" => Some(ConstraintKind::NotNull),
        // SQLITE_CONSTRAINT
        "19" => Some(ConstraintKind::Other),
        _ => None,
    }
}

/// Configuration errors.
///
/// These errors represent failures in configuration loading and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration value is invalid.
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: String,
        /// Why the value is invalid.
        reason: String,
    },
}
