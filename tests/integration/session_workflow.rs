//! Session lifecycle workflow tests.
//!
//! Tests the complete lifecycle of a student record:
//! 1. Add a student and read back its assigned id
//! 2. Commit and find it from a fresh session
//! 3. Change it in memory and save
//! 4. Delete it and verify it is gone

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use futures_util::TryStreamExt;
use pretty_assertions::assert_eq;
use serial_test::serial;
use student_records::config::{Config, EnrolledDefault};
use student_records::demo::seed_students;
use student_records::model::{Student, StudentColumn, Value};
use student_records::query::{StudentQuery, UpdateExpr};
use student_records::storage::StudentStore;
use student_records::traits::FixedTimeProvider;

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

/// Create a store seeded with the demonstration students.
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
async fn test_student_lifecycle() {
    let store = StudentStore::new_in_memory().await.unwrap();

    // Add
    let mut grace = Student::new("Grace Hopper", "grace@yale.edu", 9, at(1906, 12, 9));
    let mut session = store.begin().await.unwrap();
    let id = session.add(&mut grace).await.unwrap();
    assert_eq!(grace.id, Some(id));
    assert!(grace.enrolled_date.is_some());
    session.commit().await.unwrap();

    // Read from a fresh session
    let mut session = store.begin().await.unwrap();
    let mut loaded = session.get(id).await.unwrap().expect("Student should exist");
    assert_eq!(loaded, grace);

    // Save an in-memory change
    loaded.name = "Rear Admiral Grace Hopper".into();
    session.save(&loaded).await.unwrap();
    session.commit().await.unwrap();

    let mut session = store.begin().await.unwrap();
    let renamed = session.get(id).await.unwrap().unwrap();
    assert_eq!(renamed.name, "Rear Admiral Grace Hopper");

    // Delete
    session.delete(&renamed).await.unwrap();
    session.commit().await.unwrap();

    let mut session = store.begin().await.unwrap();
    assert!(session.get(id).await.unwrap().is_none());
    assert_eq!(session.count(&StudentQuery::new()).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn test_ids_follow_insertion_order() {
    let store = create_seeded_store().await;
    let mut session = store.begin().await.unwrap();

    let students = session.all(&StudentQuery::new()).await.unwrap();
    let ids: Vec<Option<i64>> = students.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
}

#[tokio::test]
#[serial]
async fn test_stream_reads_lazily() {
    let store = create_seeded_store().await;
    let mut session = store.begin().await.unwrap();

    let compiled = StudentQuery::new().compile_select_all();
    let first_name = {
        let mut rows = session.fetch(&compiled);
        let first = rows.try_next().await.unwrap().expect("At least one row");
        first.name
    };
    assert_eq!(first_name, "Albert Einstein");

    // The session stays usable once the stream is dropped
    assert_eq!(session.count(&StudentQuery::new()).await.unwrap(), 3);
}

#[tokio::test]
#[serial]
async fn test_set_update_by_value() {
    let store = create_seeded_store().await;

    let mut session = store.begin().await.unwrap();
    let changed = session
        .update(
            &StudentQuery::new().eq(StudentColumn::Grade, 12),
            &UpdateExpr::set(StudentColumn::Name, "Graduate"),
        )
        .await
        .unwrap();
    session.commit().await.unwrap();
    assert_eq!(changed, 1);

    let mut session = store.begin().await.unwrap();
    let rows = session
        .project(
            &StudentQuery::new().eq(StudentColumn::Name, "Graduate"),
            &[StudentColumn::Email],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get(StudentColumn::Email),
        Some(&Value::Text("jogn.doe@moringa.edu".into()))
    );
}

#[tokio::test]
#[serial]
async fn test_shared_enrolment_default_uses_open_instant() {
    let opened = at(2024, 9, 2);
    let config = Config {
        enrolled_default: EnrolledDefault::Shared,
        ..Config::default()
    };
    let store = StudentStore::open_with_clock(&config, Arc::new(FixedTimeProvider(opened)))
        .await
        .unwrap();
    assert_eq!(store.opened_at(), opened);

    let mut session = store.begin().await.unwrap();
    session
        .bulk_insert(&seed_students().unwrap())
        .await
        .unwrap();

    let enrolled: Vec<Option<NaiveDateTime>> = session
        .all(&StudentQuery::new())
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.enrolled_date)
        .collect();
    assert_eq!(enrolled, vec![Some(opened); 3]);
}

#[tokio::test]
#[serial]
async fn test_explicit_enrolment_date_is_kept() {
    let store = StudentStore::new_in_memory().await.unwrap();
    let enrolled = at(2019, 1, 7);

    let mut student = Student::new("Ada Lovelace", "ada@analytical.edu", 9, at(1815, 12, 10))
        .with_enrolled_date(enrolled);
    let mut session = store.begin().await.unwrap();
    let id = session.add(&mut student).await.unwrap();

    let loaded = session.get(id).await.unwrap().unwrap();
    assert_eq!(loaded.enrolled_date, Some(enrolled));
}
