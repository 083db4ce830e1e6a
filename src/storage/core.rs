//! Core `SQLite` store implementation.
//!
//! This module provides the [`StudentStore`] struct: connection setup, schema
//! creation and the entry point for [`Session`]s.

#![allow(clippy::missing_errors_doc)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::config::{Config, EnrolledDefault};
use crate::error::StorageError;
use crate::schema::{TableSchema, STUDENTS};
use crate::traits::{RealTimeProvider, TimeProvider};

use super::session::Session;

/// Source of `enrolled_date` values for rows inserted without one.
#[derive(Clone)]
pub(crate) struct EnrolmentDefaults {
    clock: Arc<dyn TimeProvider>,
    policy: EnrolledDefault,
    opened_at: NaiveDateTime,
}

impl EnrolmentDefaults {
    /// Timestamp to apply to the next inserted row.
    pub(crate) fn stamp(&self) -> NaiveDateTime {
        match self.policy {
            EnrolledDefault::PerRow => self.clock.now(),
            EnrolledDefault::Shared => self.opened_at,
        }
    }
}

impl std::fmt::Debug for EnrolmentDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrolmentDefaults")
            .field("policy", &self.policy)
            .field("opened_at", &self.opened_at)
            .finish_non_exhaustive()
    }
}

/// Memory-resident `SQLite` store for student records.
///
/// The store owns a single-connection pool whose connection is never reaped,
/// so the database lives exactly as long as the store. All reads and writes go
/// through a [`Session`] obtained from [`StudentStore::begin`].
#[derive(Debug, Clone)]
pub struct StudentStore {
    pub(crate) pool: SqlitePool,
    defaults: EnrolmentDefaults,
}

impl StudentStore {
    /// Get a clone of the connection pool.
    #[must_use]
    pub fn get_pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Enrolment default policy in effect.
    #[must_use]
    pub const fn enrolled_default(&self) -> EnrolledDefault {
        self.defaults.policy
    }

    /// Instant captured when the store was opened.
    ///
    /// This is the value [`EnrolledDefault::Shared`] stamps on every row.
    #[must_use]
    pub const fn opened_at(&self) -> NaiveDateTime {
        self.defaults.opened_at
    }

    /// Open the store described by `config` and create the `students` table.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ConnectionFailed`] if the connection fails and
    /// [`StorageError::SchemaFailed`] if the table cannot be created.
    pub async fn open(config: &Config) -> Result<Self, StorageError> {
        Self::open_with_clock(config, Arc::new(RealTimeProvider)).await
    }

    /// Open the store with an explicit clock for enrolment defaults.
    pub async fn open_with_clock(
        config: &Config,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&config.database_url).map_err(|e| {
            StorageError::ConnectionFailed {
                message: format!("Invalid database URL '{}': {e}", config.database_url),
            }
        })?;

        // One connection, kept forever: a memory database dies with its last connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed {
                message: format!("Failed to open database: {e}"),
            })?;

        let opened_at = clock.now();
        let store = Self {
            pool,
            defaults: EnrolmentDefaults {
                clock,
                policy: config.enrolled_default,
                opened_at,
            },
        };
        store.create_schema(&STUDENTS).await?;

        info!(
            "Student store opened: url={}, enrolled_default={}",
            config.database_url,
            config.enrolled_default.as_str()
        );

        Ok(store)
    }

    /// Create a new in-memory store with default configuration.
    pub async fn new_in_memory() -> Result<Self, StorageError> {
        Self::open(&Config::default()).await
    }

    /// Materialise a table and its indexes.
    ///
    /// Statements use `IF NOT EXISTS`, so repeating this is harmless.
    pub async fn create_schema(&self, schema: &TableSchema) -> Result<(), StorageError> {
        for statement in schema.create_statements() {
            debug!(table = schema.name, "{statement}");
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::SchemaFailed {
                    table: schema.name.to_string(),
                    message: format!("{e}"),
                })?;
        }
        Ok(())
    }

    /// Start a session.
    ///
    /// The session holds the store's only connection until it is committed,
    /// rolled back or dropped, so sessions run one after another.
    pub async fn begin(&self) -> Result<Session, StorageError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::from_sqlx("BEGIN", &e))?;
        Ok(Session::new(tx, self.defaults.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub mod tests {
    use super::*;
    use crate::traits::{FixedTimeProvider, MockTimeProvider};
    use chrono::NaiveDate;
    use serial_test::serial;
    use sqlx::Row;

    pub async fn test_store() -> StudentStore {
        StudentStore::new_in_memory()
            .await
            .expect("Failed to create test store")
    }

    pub fn instant(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn test_new_in_memory() {
        let store = StudentStore::new_in_memory().await;
        assert!(store.is_ok());
        assert_eq!(store.unwrap().enrolled_default(), EnrolledDefault::PerRow);
    }

    #[tokio::test]
    #[serial]
    async fn test_open_invalid_url() {
        let config = Config {
            database_url: "not a url".to_string(),
            ..Config::default()
        };
        let result = StudentStore::open(&config).await;
        assert!(matches!(result, Err(StorageError::ConnectionFailed { .. })));
    }

    #[tokio::test]
    #[serial]
    async fn test_schema_materialised() {
        let store = test_store().await;
        let pool = store.get_pool();

        let table = sqlx::query(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'students'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let sql: String = table.get("sql");
        assert!(sql.contains("CONSTRAINT unique_email UNIQUE (email)"));
        assert!(sql.contains("CHECK (grade BETWEEN 1 AND 12)"));

        let index = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name = 'index_name'",
        )
        .fetch_optional(&pool)
        .await
        .unwrap();
        assert!(index.is_some());
    }

    #[tokio::test]
    #[serial]
    async fn test_create_schema_is_idempotent() {
        let store = test_store().await;
        assert!(store.create_schema(&STUDENTS).await.is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn test_shared_default_uses_open_instant() {
        let opened = instant(2024, 9, 1);
        let config = Config {
            enrolled_default: EnrolledDefault::Shared,
            ..Config::default()
        };
        let store = StudentStore::open_with_clock(&config, Arc::new(FixedTimeProvider(opened)))
            .await
            .unwrap();
        assert_eq!(store.opened_at(), opened);
        assert_eq!(store.defaults.stamp(), opened);
        assert_eq!(store.defaults.stamp(), opened);
    }

    #[tokio::test]
    #[serial]
    async fn test_per_row_default_reads_clock_each_time() {
        let mut clock = MockTimeProvider::new();
        let mut seq = mockall::Sequence::new();
        clock
            .expect_now()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(instant(2024, 1, 1));
        clock
            .expect_now()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(instant(2024, 1, 2));
        clock
            .expect_now()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(instant(2024, 1, 3));

        let store = StudentStore::open_with_clock(&Config::default(), Arc::new(clock))
            .await
            .unwrap();
        assert_eq!(store.opened_at(), instant(2024, 1, 1));
        assert_eq!(store.defaults.stamp(), instant(2024, 1, 2));
        assert_eq!(store.defaults.stamp(), instant(2024, 1, 3));
    }

    #[tokio::test]
    #[serial]
    async fn test_store_debug() {
        let store = test_store().await;
        let debug = format!("{store:?}");
        assert!(debug.contains("StudentStore"));
        assert!(debug.contains("PerRow"));
    }
}
