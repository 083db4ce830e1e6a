//! The `Student` entity and the value types used to query it.
//!
//! - [`Student`]: One row of the `students` table
//! - [`StudentColumn`]: Typed column names for filters, ordering and projection
//! - [`Value`]: A bindable column value
//! - [`ProjectedRow`]: A row restricted to a subset of columns

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::error::StorageError;

/// Format used to store date-times as `TEXT`.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Render a date-time in the stored format.
#[must_use]
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Parse a date-time read back from the store.
///
/// # Errors
///
/// Returns [`StorageError::Internal`] if the text is not in [`DATETIME_FORMAT`].
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, StorageError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).map_err(|e| StorageError::Internal {
        message: format!("Failed to parse datetime '{s}': {e}"),
    })
}

/// Student record.
///
/// A student built with [`Student::new`] is detached: it has no id until the
/// store assigns one through the per-object insert path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// Full name.
    pub name: String,
    /// Unique email address.
    pub email: String,
    /// School grade, 1 to 12.
    pub grade: i64,
    /// Date of birth.
    pub birthday: NaiveDateTime,
    /// Enrolment timestamp; filled in on insert when absent.
    pub enrolled_date: Option<NaiveDateTime>,
}

impl Student {
    /// Create a detached student.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        grade: i64,
        birthday: NaiveDateTime,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            grade,
            birthday,
            enrolled_date: None,
        }
    }

    /// Set the store id.
    #[must_use]
    pub const fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Set an explicit enrolment timestamp.
    #[must_use]
    pub const fn with_enrolled_date(mut self, enrolled_date: NaiveDateTime) -> Self {
        self.enrolled_date = Some(enrolled_date);
        self
    }

    /// Whether the store has assigned an id.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Value of a column on this record.
    #[must_use]
    pub fn get(&self, column: StudentColumn) -> Value {
        match column {
            StudentColumn::Id => self.id.map_or(Value::Null, Value::Integer),
            StudentColumn::Name => Value::Text(self.name.clone()),
            StudentColumn::Email => Value::Text(self.email.clone()),
            StudentColumn::Grade => Value::Integer(self.grade),
            StudentColumn::Birthday => Value::DateTime(self.birthday),
            StudentColumn::EnrolledDate => self.enrolled_date.map_or(Value::Null, Value::DateTime),
        }
    }
}

// e.g. "Student 1: Albert Einstein, Grade 6"
impl Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Student {id}: {}, Grade {}", self.name, self.grade),
            None => write!(f, "Student None: {}, Grade {}", self.name, self.grade),
        }
    }
}

/// Columns of the `students` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentColumn {
    /// `id`
    Id,
    /// `name`
    Name,
    /// `email`
    Email,
    /// `grade`
    Grade,
    /// `birthday`
    Birthday,
    /// `enrolled_date`
    EnrolledDate,
}

impl StudentColumn {
    /// All columns in table order.
    pub const ALL: [Self; 6] = [
        Self::Id,
        Self::Name,
        Self::Email,
        Self::Grade,
        Self::Birthday,
        Self::EnrolledDate,
    ];

    /// Column name in the table.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::Grade => "grade",
            Self::Birthday => "birthday",
            Self::EnrolledDate => "enrolled_date",
        }
    }

    /// Parse from a column name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Whether the column holds integers.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Id | Self::Grade)
    }

    /// Whether the column holds date-times.
    #[must_use]
    pub const fn is_datetime(&self) -> bool {
        matches!(self, Self::Birthday | Self::EnrolledDate)
    }

    /// Whether a [`Student`] can hold no value for this column.
    ///
    /// Only `enrolled_date` is optional on the entity, even though the table
    /// itself accepts `NULL` in every column but `id`.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(self, Self::EnrolledDate)
    }
}

impl Display for StudentColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Integer value.
    Integer(i64),
    /// Text value.
    Text(String),
    /// Date-time value, stored as text.
    DateTime(NaiveDateTime),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::DateTime(v) => f.write_str(&format_datetime(v)),
        }
    }
}

/// A row restricted to the requested columns, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedRow {
    /// `(column, value)` pairs.
    pub values: Vec<(StudentColumn, Value)>,
}

impl ProjectedRow {
    /// Value of a column, if it was projected.
    #[must_use]
    pub fn get(&self, column: StudentColumn) -> Option<&Value> {
        self.values
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }
}

impl Value {
    /// Quoted form used inside a row tuple: text in quotes, date-times as
    /// `datetime.datetime(y, m, d, h, min[, s[, us]])`.
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::Null | Self::Integer(_) => self.to_string(),
            Self::Text(v) if v.contains('\'') && !v.contains('"') => format!("\"{v}\""),
            Self::Text(v) => format!("'{}'", v.replace('\'', "\\'")),
            Self::DateTime(v) => {
                let mut parts = vec![
                    v.year().to_string(),
                    v.month().to_string(),
                    v.day().to_string(),
                    v.hour().to_string(),
                    v.minute().to_string(),
                ];
                let micros = v.nanosecond() / 1_000;
                if v.second() != 0 || micros != 0 {
                    parts.push(v.second().to_string());
                }
                if micros != 0 {
                    parts.push(micros.to_string());
                }
                format!("datetime.datetime({})", parts.join(", "))
            }
        }
    }
}

// e.g. "('Albert Einstein', 6)", and "('Alan Turing',)" for one column
impl Display for ProjectedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, (_, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&value.repr())?;
        }
        if self.values.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str(")")
    }
}

/// Render items the way a list prints: `[a, b, c]`.
#[must_use]
pub fn display_list<T: Display>(items: &[T]) -> String {
    let inner: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", inner.join(", "))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn birthday() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1879, 3, 14)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_student_is_detached() {
        let s = Student::new("Albert Einstein", "albert.einstein@zurich.edu", 6, birthday());
        assert!(!s.is_persisted());
        assert!(s.enrolled_date.is_none());
    }

    #[test]
    fn test_display_persisted() {
        let s = Student::new("Albert Einstein", "albert.einstein@zurich.edu", 6, birthday())
            .with_id(1);
        assert_eq!(s.to_string(), "Student 1: Albert Einstein, Grade 6");
    }

    #[test]
    fn test_display_detached() {
        let s = Student::new("Alan Turing", "alan.turing@sherborne.edu", 11, birthday());
        assert_eq!(s.to_string(), "Student None: Alan Turing, Grade 11");
    }

    #[test]
    fn test_get_column_values() {
        let s = Student::new("Alan Turing", "alan.turing@sherborne.edu", 11, birthday());
        assert_eq!(s.get(StudentColumn::Id), Value::Null);
        assert_eq!(s.get(StudentColumn::Grade), Value::Integer(11));
        assert_eq!(s.get(StudentColumn::Name), Value::from("Alan Turing"));
        assert_eq!(s.get(StudentColumn::Birthday), Value::DateTime(birthday()));
        assert_eq!(s.get(StudentColumn::EnrolledDate), Value::Null);
    }

    #[test]
    fn test_column_parse() {
        for column in StudentColumn::ALL {
            assert_eq!(StudentColumn::parse(column.as_str()), Some(column));
        }
        assert_eq!(StudentColumn::parse("age"), None);
    }

    #[test]
    fn test_column_kinds() {
        assert!(StudentColumn::Grade.is_integer());
        assert!(StudentColumn::Id.is_integer());
        assert!(!StudentColumn::Name.is_integer());
        assert!(StudentColumn::Birthday.is_datetime());
        assert!(!StudentColumn::Email.is_datetime());
    }

    #[test]
    fn test_datetime_format_and_parse() {
        let text = format_datetime(&birthday());
        assert_eq!(text, "1879-03-14 00:00:00.000000");
        assert_eq!(parse_datetime(&text).unwrap(), birthday());
    }

    #[test]
    fn test_parse_datetime_invalid() {
        match parse_datetime("not-a-datetime") {
            Err(StorageError::Internal { message }) => {
                assert!(message.contains("not-a-datetime"));
            }
            other => panic!("Expected Internal error, got {other:?}"),
        }
    }

    #[test]
    fn test_projected_row_display() {
        let row = ProjectedRow {
            values: vec![
                (StudentColumn::Name, Value::from("Alan Turing")),
                (StudentColumn::Grade, Value::Integer(11)),
            ],
        };
        assert_eq!(row.to_string(), "('Alan Turing', 11)");
        assert_eq!(row.get(StudentColumn::Grade), Some(&Value::Integer(11)));
        assert_eq!(row.get(StudentColumn::Email), None);
    }

    #[test]
    fn test_projected_single_column_keeps_trailing_comma() {
        let row = ProjectedRow {
            values: vec![(StudentColumn::Name, Value::from("John Doe"))],
        };
        assert_eq!(row.to_string(), "('John Doe',)");
    }

    #[test]
    fn test_value_repr() {
        assert_eq!(Value::Null.repr(), "None");
        assert_eq!(Value::Integer(12).repr(), "12");
        assert_eq!(Value::from("Alan Turing").repr(), "'Alan Turing'");
        assert_eq!(Value::from("O'Brien").repr(), "\"O'Brien\"");
        assert_eq!(Value::from("say \"O'Hi\"").repr(), "'say \"O\\'Hi\"'");
        assert_eq!(
            Value::DateTime(birthday()).repr(),
            "datetime.datetime(1879, 3, 14, 0, 0)"
        );
        let precise = birthday()
            .with_second(5)
            .unwrap()
            .with_nanosecond(250_000_000)
            .unwrap();
        assert_eq!(
            Value::DateTime(precise).repr(),
            "datetime.datetime(1879, 3, 14, 0, 0, 5, 250000)"
        );
    }

    #[test]
    fn test_display_list() {
        let items = vec![Value::Integer(1), Value::Null];
        assert_eq!(display_list(&items), "[1, None]");
        assert_eq!(display_list::<Value>(&[]), "[]");
    }
}
