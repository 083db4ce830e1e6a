//! Student Records
//!
//! Maps a single `Student` entity onto a `students` table in a
//! memory-resident `SQLite` database and runs create, read, update and delete
//! operations against it through explicit transaction handles.
//!
//! # Features
//!
//! - Declarative table description rendered to DDL (primary key, unique email,
//!   grade range check, name index)
//! - Atomic bulk inserts and per-object inserts that write ids back
//! - Lazy row streams, projections, filters, ordering, limits and counts
//! - In-memory save and set-based update expressions
//! - Delete by object or by filter
//! - Explicit commit and rollback
//!
//! # Quick Start
//!
//! ```bash
//! LOG_LEVEL=debug ./student-records
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   StudentQuery    ┌─────────┐   sqlx    ┌───────────────────┐
//! │   demo   │──────────────────▶│ Session │──────────▶│ SQLite (:memory:) │
//! └──────────┘   Student rows    └─────────┘           └───────────────────┘
//!                                     ▲
//!                       StudentStore::begin()
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod demo;
pub mod error;
pub mod model;
pub mod query;
pub mod schema;
pub mod storage;
pub mod traits;
