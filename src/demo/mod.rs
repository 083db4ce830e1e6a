//! The demonstration sequence run by the `student-records` binary.
//!
//! Seeds three students, then walks through reading, projecting, ordering,
//! counting, filtering, both update strategies and both delete strategies,
//! writing each result to the given output.

use std::io::Write;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::error::{AppError, StorageError};
use crate::model::{display_list, Student, StudentColumn};
use crate::query::{Direction, StudentQuery, UpdateExpr};
use crate::storage::StudentStore;

fn midnight(year: i32, month: u32, day: u32) -> Result<NaiveDateTime, StorageError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| StorageError::Internal {
            message: format!("invalid date {year}-{month}-{day}"),
        })
}

/// The three students the demonstration starts with.
///
/// # Errors
///
/// Returns [`StorageError::Internal`] only if a hard-coded birthday is not a
/// real date.
pub fn seed_students() -> Result<Vec<Student>, StorageError> {
    Ok(vec![
        Student::new(
            "Albert Einstein",
            "albert.einstein@zurich.edu",
            6,
            midnight(1879, 3, 14)?,
        ),
        Student::new(
            "Alan Turing",
            "alan.turing@sherborne.edu",
            11,
            midnight(1912, 6, 23)?,
        ),
        Student::new("John Doe", "jogn.doe@moringa.edu", 12, midnight(2000, 7, 15)?),
    ])
}

fn or_none<T: std::fmt::Display>(item: Option<&T>) -> String {
    item.map_or_else(|| "None".to_string(), ToString::to_string)
}

/// Run the full demonstration against `store`, writing results to `out`.
///
/// # Errors
///
/// Returns [`AppError::Storage`] on the first failed store operation and
/// [`AppError::Output`] if writing fails. Nothing is retried.
pub async fn run<W: Write>(store: &StudentStore, out: &mut W) -> Result<(), AppError> {
    let name_grade = [StudentColumn::Name, StudentColumn::Grade];

    // Create
    let mut session = store.begin().await?;
    let inserted = session.bulk_insert(&seed_students()?).await?;
    session.commit().await?;
    info!("Seeded {inserted} students");

    // Read
    let mut session = store.begin().await?;

    let students = session.all(&StudentQuery::new()).await?;
    writeln!(out, "{}", display_list(&students))?;

    let rows = session.project(&StudentQuery::new(), &name_grade).await?;
    writeln!(out, "{}", display_list(&rows))?;

    let by_name = StudentQuery::new().order_by(StudentColumn::Name, Direction::Asc);
    let rows = session.project(&by_name, &[StudentColumn::Name]).await?;
    writeln!(out, "{}", display_list(&rows))?;

    let by_grade = StudentQuery::new().order_by(StudentColumn::Grade, Direction::Desc);
    let rows = session.project(&by_grade.clone().limit(1), &name_grade).await?;
    writeln!(out, "{}", display_list(&rows))?;

    let top = session.first(&by_grade).await?;
    writeln!(out, "{}", or_none(top.as_ref()))?;

    let count = session.count(&StudentQuery::new()).await?;
    writeln!(out, "{count}")?;

    let filtered = StudentQuery::new()
        .contains(StudentColumn::Name, "Alan")
        .eq(StudentColumn::Grade, 11);
    for record in session.all(&filtered).await? {
        writeln!(out, "{}", record.name)?;
    }
    session.commit().await?;

    // Update: load, change in memory, save
    let einstein = StudentQuery::new().eq(StudentColumn::Name, "Albert Einstein");
    let mut session = store.begin().await?;
    for mut student in session.all(&einstein).await? {
        student.grade += 1;
        session.save(&student).await?;
    }
    session.commit().await?;

    let mut session = store.begin().await?;
    let rows = session.project(&StudentQuery::new(), &name_grade).await?;
    writeln!(out, "{}", display_list(&rows))?;

    // Update: set-based expression
    let changed = session
        .update(
            &StudentQuery::new().contains(StudentColumn::Name, "Alan"),
            &UpdateExpr::add(StudentColumn::Grade, 1),
        )
        .await?;
    session.commit().await?;
    info!("Set-based update changed {changed} rows");

    let mut session = store.begin().await?;
    let rows = session.project(&StudentQuery::new(), &name_grade).await?;
    writeln!(out, "{}", display_list(&rows))?;
    session.commit().await?;

    // Delete: the first match, as an object
    let mut session = store.begin().await?;
    if let Some(albert) = session.first(&einstein).await? {
        session.delete(&albert).await?;
    }
    session.commit().await?;

    let mut session = store.begin().await?;
    let albert = session.first(&einstein).await?;
    writeln!(out, "{}", or_none(albert.as_ref()))?;
    session.commit().await?;

    // Delete: every match, in one statement
    let john = StudentQuery::new().eq(StudentColumn::Name, "John Doe");
    let mut session = store.begin().await?;
    let removed = session.delete_where(&john).await?;
    session.commit().await?;
    info!("Bulk delete removed {removed} rows");

    let mut session = store.begin().await?;
    let john = session.first(&john).await?;
    writeln!(out, "{}", or_none(john.as_ref()))?;
    let remaining = session.all(&StudentQuery::new()).await?;
    writeln!(out, "{}", display_list(&remaining))?;
    session.commit().await?;

    Ok(())
}
