//! Session (unit of work) operations.
//!
//! A [`Session`] wraps one database transaction. Every create, read, update
//! and delete runs inside it; nothing is visible to later sessions until
//! [`Session::commit`] succeeds. Dropping a session without committing rolls
//! its changes back.

#![allow(clippy::missing_errors_doc)]

use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use sqlx::{Connection, QueryBuilder, Row, Sqlite, Transaction};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::model::{format_datetime, ProjectedRow, Student, StudentColumn};
use crate::query::{CompiledQuery, StudentQuery, UpdateExpr};

use super::core::EnrolmentDefaults;
use super::rows::{bind_values, row_to_projected, row_to_student};

/// Rows per `INSERT` statement in a bulk insert.
///
/// Six binds per row keeps each statement well below `SQLite`'s default limit
/// of 32766 bind parameters.
pub const BULK_INSERT_CHUNK: usize = 500;

const INSERT_COLUMNS: &str =
    "INSERT INTO students (id, name, email, grade, birthday, enrolled_date) ";

/// Transaction handle for student records.
pub struct Session {
    tx: Transaction<'static, Sqlite>,
    defaults: EnrolmentDefaults,
    pending_writes: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("defaults", &self.defaults)
            .field("pending_writes", &self.pending_writes)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) const fn new(tx: Transaction<'static, Sqlite>, defaults: EnrolmentDefaults) -> Self {
        Self {
            tx,
            defaults,
            pending_writes: 0,
        }
    }

    /// Rows written in this session and not yet committed.
    #[must_use]
    pub const fn pending_writes(&self) -> u64 {
        self.pending_writes
    }

    // ========== Create ==========

    /// Insert one student and write the assigned id back onto it.
    ///
    /// A missing `enrolled_date` is filled with the store's enrolment default
    /// and also written back.
    pub async fn add(&mut self, student: &mut Student) -> Result<i64, StorageError> {
        let enrolled_date = student
            .enrolled_date
            .unwrap_or_else(|| self.defaults.stamp());

        let result = sqlx::query(
            "INSERT INTO students (id, name, email, grade, birthday, enrolled_date)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(student.id)
        .bind(&student.name)
        .bind(&student.email)
        .bind(student.grade)
        .bind(format_datetime(&student.birthday))
        .bind(format_datetime(&enrolled_date))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StorageError::from_sqlx("INSERT students", &e))?;

        let id = result.last_insert_rowid();
        student.id = Some(id);
        student.enrolled_date = Some(enrolled_date);
        self.pending_writes += 1;

        debug!(id, email = %student.email, "Student added");
        Ok(id)
    }

    /// Insert many students as one atomic batch.
    ///
    /// Assigned ids are not written back onto `students`; query the rows to
    /// learn them. If any row violates a constraint, no row of the batch is
    /// kept and the session is left as it was before the call.
    pub async fn bulk_insert(&mut self, students: &[Student]) -> Result<u64, StorageError> {
        if students.is_empty() {
            return Ok(0);
        }

        let defaults = &self.defaults;
        let mut savepoint = Connection::begin(&mut *self.tx)
            .await
            .map_err(|e| StorageError::from_sqlx("SAVEPOINT", &e))?;

        let mut inserted = 0;
        for chunk in students.chunks(BULK_INSERT_CHUNK) {
            let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(INSERT_COLUMNS);
            builder.push_values(chunk, |mut row, student| {
                let enrolled_date = student.enrolled_date.unwrap_or_else(|| defaults.stamp());
                row.push_bind(student.id)
                    .push_bind(student.name.clone())
                    .push_bind(student.email.clone())
                    .push_bind(student.grade)
                    .push_bind(format_datetime(&student.birthday))
                    .push_bind(format_datetime(&enrolled_date));
            });

            match builder.build().execute(&mut *savepoint).await {
                Ok(result) => inserted += result.rows_affected(),
                Err(e) => {
                    let err = StorageError::from_sqlx("INSERT students (bulk)", &e);
                    savepoint
                        .rollback()
                        .await
                        .map_err(|e| StorageError::from_sqlx("ROLLBACK TO SAVEPOINT", &e))?;
                    debug!(rows = students.len(), "Bulk insert rolled back: {err}");
                    return Err(err);
                }
            }
        }

        savepoint
            .commit()
            .await
            .map_err(|e| StorageError::from_sqlx("RELEASE SAVEPOINT", &e))?;

        self.pending_writes += inserted;
        debug!(rows = inserted, "Bulk insert");
        Ok(inserted)
    }

    // ========== Read ==========

    /// Stream the students selected by a compiled query.
    ///
    /// Rows are decoded as they arrive. `query` must select every column in
    /// table order, as [`StudentQuery::compile_select_all`] does.
    pub fn fetch<'a>(
        &'a mut self,
        query: &'a CompiledQuery,
    ) -> BoxStream<'a, Result<Student, StorageError>> {
        bind_values(sqlx::query(&query.sql), &query.binds)
            .fetch(&mut *self.tx)
            .map(|row| {
                let row = row.map_err(|e| StorageError::from_sqlx("SELECT students", &e))?;
                row_to_student(&row)
            })
            .boxed()
    }

    /// Stream rows restricted to `columns`.
    ///
    /// `query` must select exactly `columns`, as
    /// [`StudentQuery::compile_select`] does.
    pub fn fetch_projected<'a>(
        &'a mut self,
        query: &'a CompiledQuery,
        columns: &'a [StudentColumn],
    ) -> BoxStream<'a, Result<ProjectedRow, StorageError>> {
        bind_values(sqlx::query(&query.sql), &query.binds)
            .fetch(&mut *self.tx)
            .map(move |row| {
                let row = row.map_err(|e| StorageError::from_sqlx("SELECT students", &e))?;
                row_to_projected(&row, columns)
            })
            .boxed()
    }

    /// All students matching `query`.
    pub async fn all(&mut self, query: &StudentQuery) -> Result<Vec<Student>, StorageError> {
        let compiled = query.compile_select_all();
        self.fetch(&compiled).try_collect().await
    }

    /// The requested columns of every student matching `query`.
    pub async fn project(
        &mut self,
        query: &StudentQuery,
        columns: &[StudentColumn],
    ) -> Result<Vec<ProjectedRow>, StorageError> {
        if columns.is_empty() {
            return Err(StorageError::InvalidQuery {
                message: "projection needs at least one column".into(),
            });
        }
        let compiled = query.compile_select(columns);
        self.fetch_projected(&compiled, columns).try_collect().await
    }

    /// First student matching `query`, or `None`.
    pub async fn first(&mut self, query: &StudentQuery) -> Result<Option<Student>, StorageError> {
        let compiled = query.clone().limit(1).compile_select_all();
        let row = bind_values(sqlx::query(&compiled.sql), &compiled.binds)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| StorageError::from_sqlx("SELECT students", &e))?;

        row.as_ref().map(row_to_student).transpose()
    }

    /// Student with the given id, or `None`.
    pub async fn get(&mut self, id: i64) -> Result<Option<Student>, StorageError> {
        self.first(&StudentQuery::new().eq(StudentColumn::Id, id))
            .await
    }

    /// Number of students matching `query`'s filters.
    pub async fn count(&mut self, query: &StudentQuery) -> Result<i64, StorageError> {
        let compiled = query.compile_count();
        let row = bind_values(sqlx::query(&compiled.sql), &compiled.binds)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| StorageError::from_sqlx("SELECT COUNT students", &e))?;

        row.try_get::<i64, _>(0).map_err(|e| StorageError::Internal {
            message: format!("Failed to read count: {e}"),
        })
    }

    // ========== Update ==========

    /// Persist every column of an in-memory student back to its row.
    pub async fn save(&mut self, student: &Student) -> Result<(), StorageError> {
        let id = student.id.ok_or_else(|| StorageError::Detached {
            email: student.email.clone(),
        })?;

        let result = sqlx::query(
            "UPDATE students SET name = ?, email = ?, grade = ?, birthday = ?, enrolled_date = ?
             WHERE id = ?",
        )
        .bind(&student.name)
        .bind(&student.email)
        .bind(student.grade)
        .bind(format_datetime(&student.birthday))
        .bind(student.enrolled_date.as_ref().map(format_datetime))
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StorageError::from_sqlx("UPDATE students", &e))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound { id });
        }

        self.pending_writes += 1;
        debug!(id, "Student saved");
        Ok(())
    }

    /// Apply `expr` to every student matching `query` without loading them.
    ///
    /// Returns the number of rows changed. Ordering and limit on `query` are
    /// ignored.
    pub async fn update(
        &mut self,
        query: &StudentQuery,
        expr: &UpdateExpr,
    ) -> Result<u64, StorageError> {
        let compiled = query.compile_update(expr)?;
        let changed = self.execute("UPDATE students", &compiled).await?;
        debug!(rows = changed, "Set-based update");
        Ok(changed)
    }

    // ========== Delete ==========

    /// Delete the row of a persisted student.
    pub async fn delete(&mut self, student: &Student) -> Result<(), StorageError> {
        let id = student.id.ok_or_else(|| StorageError::Detached {
            email: student.email.clone(),
        })?;

        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| StorageError::from_sqlx("DELETE students", &e))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound { id });
        }

        self.pending_writes += 1;
        debug!(id, "Student deleted");
        Ok(())
    }

    /// Delete every student matching `query`. Returns the number removed.
    pub async fn delete_where(&mut self, query: &StudentQuery) -> Result<u64, StorageError> {
        let compiled = query.compile_delete();
        let removed = self.execute("DELETE students", &compiled).await?;
        debug!(rows = removed, "Bulk delete");
        Ok(removed)
    }

    // ========== Finalise ==========

    /// Make every pending change visible to later sessions.
    pub async fn commit(self) -> Result<(), StorageError> {
        let pending = self.pending_writes;
        self.tx
            .commit()
            .await
            .map_err(|e| StorageError::from_sqlx("COMMIT", &e))?;
        info!(pending_writes = pending, "Session committed");
        Ok(())
    }

    /// Discard every pending change.
    pub async fn rollback(self) -> Result<(), StorageError> {
        let pending = self.pending_writes;
        self.tx
            .rollback()
            .await
            .map_err(|e| StorageError::from_sqlx("ROLLBACK", &e))?;
        info!(pending_writes = pending, "Session rolled back");
        Ok(())
    }

    async fn execute(
        &mut self,
        label: &str,
        compiled: &CompiledQuery,
    ) -> Result<u64, StorageError> {
        let result = bind_values(sqlx::query(&compiled.sql), &compiled.binds)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| StorageError::from_sqlx(label, &e))?;

        let rows = result.rows_affected();
        self.pending_writes += rows;
        Ok(rows)
    }
}
