//! Error recovery integration tests.
//!
//! Tests that failed operations leave the store consistent:
//! - Constraint violations inside a session
//! - Detached and missing objects
//! - Invalid update expressions and projections
//! - Sessions dropped without commit

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::NaiveDateTime;
use serial_test::serial;
use student_records::config::Config;
use student_records::demo::seed_students;
use student_records::error::{ConstraintKind, StorageError};
use student_records::model::{Student, StudentColumn};
use student_records::query::{StudentQuery, UpdateExpr};
use student_records::storage::StudentStore;

async fn create_seeded_store() -> StudentStore {
    let store = StudentStore::new_in_memory()
        .await
        .expect("Failed to create store");
    let mut session = store.begin().await.expect("Failed to begin");
    session
        .bulk_insert(&seed_students().expect("Failed to build seeds"))
        .await
        .expect("Failed to seed");
    session.commit().await.expect("Failed to commit");
    store
}

#[tokio::test]
#[serial]
async fn test_session_usable_after_constraint_violation() {
    let store = create_seeded_store().await;
    let mut session = store.begin().await.unwrap();

    let mut clash = Student::new(
        "Another Einstein",
        "albert.einstein@zurich.edu",
        5,
        NaiveDateTime::default(),
    );
    let err = session.add(&mut clash).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::ConstraintViolation {
            kind: ConstraintKind::Unique,
            ..
        }
    ));
    assert!(clash.id.is_none());

    // Other work in the same session still goes through
    let mut fresh = Student::new(
        "Marie Curie",
        "marie@sorbonne.edu",
        10,
        NaiveDateTime::default(),
    );
    session.add(&mut fresh).await.unwrap();
    session.commit().await.unwrap();

    let mut session = store.begin().await.unwrap();
    assert_eq!(session.count(&StudentQuery::new()).await.unwrap(), 4);
}

#[tokio::test]
#[serial]
async fn test_save_detached_student_fails() {
    let store = create_seeded_store().await;
    let mut session = store.begin().await.unwrap();

    let detached = Student::new("Nobody", "nobody@nowhere.edu", 3, NaiveDateTime::default());
    let err = session.save(&detached).await.unwrap_err();
    assert!(matches!(err, StorageError::Detached { .. }));

    let err = session.delete(&detached).await.unwrap_err();
    assert!(matches!(err, StorageError::Detached { .. }));
}

#[tokio::test]
#[serial]
async fn test_save_deleted_student_reports_not_found() {
    let store = create_seeded_store().await;
    let mut session = store.begin().await.unwrap();

    let turing = session
        .first(&StudentQuery::new().eq(StudentColumn::Name, "Alan Turing"))
        .await
        .unwrap()
        .unwrap();
    session.delete(&turing).await.unwrap();

    let err = session.save(&turing).await.unwrap_err();
    assert_eq!(err, StorageError::NotFound { id: 2 });
}

#[tokio::test]
#[serial]
async fn test_invalid_requests_are_rejected_before_execution() {
    let store = create_seeded_store().await;
    let mut session = store.begin().await.unwrap();

    let err = session
        .update(&StudentQuery::new(), &UpdateExpr::add(StudentColumn::Name, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidQuery { .. }));

    let err = session
        .update(&StudentQuery::new(), &UpdateExpr::set(StudentColumn::Id, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidQuery { .. }));

    let err = session.project(&StudentQuery::new(), &[]).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidQuery { .. }));

    assert_eq!(session.pending_writes(), 0);
}

#[tokio::test]
#[serial]
async fn test_dropped_session_discards_changes() {
    let store = create_seeded_store().await;

    {
        let mut session = store.begin().await.unwrap();
        session.delete_where(&StudentQuery::new()).await.unwrap();
        assert_eq!(session.count(&StudentQuery::new()).await.unwrap(), 0);
    }

    let mut session = store.begin().await.unwrap();
    assert_eq!(session.count(&StudentQuery::new()).await.unwrap(), 3);
}

#[tokio::test]
#[serial]
async fn test_open_with_malformed_url_fails() {
    let config = Config {
        database_url: "postgres://localhost/students".into(),
        ..Config::default()
    };
    let err = StudentStore::open(&config).await.unwrap_err();
    assert!(matches!(err, StorageError::ConnectionFailed { .. }));
}
