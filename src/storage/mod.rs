//! Storage backend.
//!
//! This module provides:
//! - [`StudentStore`]: the memory-resident `SQLite` store and schema creation
//! - [`Session`]: an explicit transaction handle carrying every create, read,
//!   update and delete operation
//!
//! # Architecture
//!
//! The storage layer uses `SQLite` through the `sqlx` crate. The store keeps a
//! single connection alive for its whole lifetime; each [`Session`] borrows it
//! for one transaction and must be committed for its changes to be seen by
//! later sessions.
//!
//! The implementation is split across submodules:
//! - `core`: Pool setup, schema creation and enrolment defaults
//! - `session`: Session CRUD operations
//! - `rows`: Value binding and row decoding
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> Result<(), student_records::error::StorageError> {
//! use student_records::model::{Student, StudentColumn};
//! use student_records::query::StudentQuery;
//! use student_records::storage::StudentStore;
//! # let birthday = chrono::NaiveDateTime::default();
//!
//! let store = StudentStore::new_in_memory().await?;
//! let mut session = store.begin().await?;
//! session
//!     .bulk_insert(&[Student::new("Alan Turing", "alan.turing@sherborne.edu", 11, birthday)])
//!     .await?;
//! session.commit().await?;
//!
//! let mut session = store.begin().await?;
//! let alan = session
//!     .first(&StudentQuery::new().eq(StudentColumn::Name, "Alan Turing"))
//!     .await?;
//! assert!(alan.is_some());
//! # Ok(())
//! # }
//! ```

mod core;
mod rows;
mod session;

pub use self::core::StudentStore;
pub use session::{Session, BULK_INSERT_CHUNK};
