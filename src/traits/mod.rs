//! Trait definitions for mockable dependencies.
//!
//! - [`TimeProvider`]: Clock used for enrolment timestamps
//!
//! # Mocking
//!
//! Traits are annotated with `#[cfg_attr(test, mockall::automock)]`
//! which generates mock implementations automatically for testing.
//!
//! # Example
//!
//! ```
//! use student_records::traits::{TimeProvider, RealTimeProvider};
//!
//! let time_provider = RealTimeProvider;
//! let now = time_provider.now();
//! println!("Current time: {now}");
//! ```

use chrono::{Local, NaiveDateTime, SubsecRound};

/// Time provider trait for deterministic testing.
///
/// This trait abstracts the clock so enrolment defaults can be pinned in
/// tests.
#[cfg_attr(test, mockall::automock)]
pub trait TimeProvider: Send + Sync {
    /// Get the current local time.
    fn now(&self) -> NaiveDateTime;
}

/// Real time provider using the system clock, truncated to microseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local().trunc_subsecs(6)
    }
}

/// Time provider that always returns the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTimeProvider(pub NaiveDateTime);

impl TimeProvider for FixedTimeProvider {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
