//! Integration tests for the student record store.
//!
//! These tests verify end-to-end workflows including:
//! - Session lifecycle across commits
//! - Enrolment defaults under a fixed clock
//! - Error recovery paths

mod error_recovery;
mod session_workflow;
