//! Conversions between [`Value`]s, bind parameters and `SQLite` rows.

use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{ColumnIndex, Decode, Row, Type};

use crate::error::StorageError;
use crate::model::{format_datetime, parse_datetime, ProjectedRow, Student, StudentColumn, Value};

/// Bind `values` to `query` in placeholder order.
pub(crate) fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Integer(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            Value::DateTime(v) => query.bind(format_datetime(v)),
        };
    }
    query
}

/// Read one column, reporting decode failures as [`StorageError::Internal`].
fn read<'r, T, I>(row: &'r SqliteRow, index: I) -> Result<T, StorageError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
    I: ColumnIndex<SqliteRow> + std::fmt::Debug + Copy,
{
    row.try_get(index).map_err(|e| StorageError::Internal {
        message: format!("Failed to read column {index:?}: {e}"),
    })
}

/// Read a column the entity requires; `NULL` is an error, not a default.
fn required<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, StorageError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    read::<Option<T>, _>(row, column)?.ok_or_else(|| StorageError::Internal {
        message: format!("Unexpected NULL in required column {column}"),
    })
}

/// Convert a full `students` row to a [`Student`].
pub(crate) fn row_to_student(row: &SqliteRow) -> Result<Student, StorageError> {
    let id: i64 = required(row, "id")?;
    let name: String = required(row, "name")?;
    let email: String = required(row, "email")?;
    let grade: i64 = required(row, "grade")?;
    let birthday: String = required(row, "birthday")?;
    let enrolled_date: Option<String> = read(row, "enrolled_date")?;

    let mut student = Student::new(name, email, grade, parse_datetime(&birthday)?).with_id(id);
    if let Some(enrolled) = enrolled_date {
        student = student.with_enrolled_date(parse_datetime(&enrolled)?);
    }

    Ok(student)
}

/// Convert a projected row; `columns` must match the select list order.
pub(crate) fn row_to_projected(
    row: &SqliteRow,
    columns: &[StudentColumn],
) -> Result<ProjectedRow, StorageError> {
    let values = columns
        .iter()
        .enumerate()
        .map(|(index, column)| Ok((*column, read_value(row, index, *column)?)))
        .collect::<Result<Vec<_>, StorageError>>()?;

    Ok(ProjectedRow { values })
}

fn read_value(row: &SqliteRow, index: usize, column: StudentColumn) -> Result<Value, StorageError> {
    if column.is_integer() {
        let v: Option<i64> = read(row, index)?;
        return Ok(v.map_or(Value::Null, Value::Integer));
    }

    let text: Option<String> = read(row, index)?;
    match text {
        None => Ok(Value::Null),
        Some(s) if column.is_datetime() => Ok(Value::DateTime(parse_datetime(&s)?)),
        Some(s) => Ok(Value::Text(s)),
    }
}
