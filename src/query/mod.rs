//! Query building for the `students` table.
//!
//! [`StudentQuery`] collects filters (combined with `AND`), ordering and a
//! limit, and compiles them into a [`CompiledQuery`]: parameterised SQL plus the
//! values to bind. [`UpdateExpr`] describes a set-based update applied to every
//! row a query matches.
//!
//! # Example
//!
//! ```
//! use student_records::model::StudentColumn;
//! use student_records::query::{Direction, StudentQuery};
//!
//! let query = StudentQuery::new()
//!     .contains(StudentColumn::Name, "Alan")
//!     .eq(StudentColumn::Grade, 11)
//!     .order_by(StudentColumn::Grade, Direction::Desc);
//!
//! let compiled = query.compile_select(&[StudentColumn::Name]);
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT name FROM students WHERE name LIKE ? AND grade = ? ORDER BY grade DESC, rowid ASC"
//! );
//! ```

use crate::error::StorageError;
use crate::model::{StudentColumn, Value};
use crate::schema::STUDENTS;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl Direction {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Row predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Exact match. [`Value::Null`] matches `NULL`.
    Eq(StudentColumn, Value),
    /// SQL `LIKE` pattern match (`%` and `_` wildcards).
    Like(StudentColumn, String),
}

/// Parameterised SQL and its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Values for the placeholders.
    pub binds: Vec<Value>,
}

/// Query over the `students` table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StudentQuery {
    filters: Vec<Filter>,
    order: Vec<(StudentColumn, Direction)>,
    limit: Option<u32>,
}

impl StudentQuery {
    /// Query matching every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter; all filters must hold.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Require `column = value`.
    #[must_use]
    pub fn eq(self, column: StudentColumn, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq(column, value.into()))
    }

    /// Require `column LIKE pattern`.
    #[must_use]
    pub fn like(self, column: StudentColumn, pattern: impl Into<String>) -> Self {
        self.filter(Filter::Like(column, pattern.into()))
    }

    /// Require `column` to contain `needle` (`LIKE '%needle%'`).
    ///
    /// `needle` is not escaped: `%` and `_` inside it keep their `LIKE`
    /// meaning, so `contains(Name, "a_b")` also matches `"axb"`.
    #[must_use]
    pub fn contains(self, column: StudentColumn, needle: &str) -> Self {
        self.like(column, format!("%{needle}%"))
    }

    /// Append an ordering key. Later keys break ties of earlier ones.
    #[must_use]
    pub fn order_by(mut self, column: StudentColumn, direction: Direction) -> Self {
        self.order.push((column, direction));
        self
    }

    /// Return at most `n` rows.
    #[must_use]
    pub const fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Filters of this query.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Row limit, if any.
    #[must_use]
    pub const fn row_limit(&self) -> Option<u32> {
        self.limit
    }

    /// Compile a `SELECT` of the given columns.
    ///
    /// When the query is ordered, the implicit `rowid` is appended as the last
    /// key so ties come back in insertion order.
    #[must_use]
    pub fn compile_select(&self, columns: &[StudentColumn]) -> CompiledQuery {
        let mut binds = Vec::new();
        let list: Vec<&str> = columns.iter().map(StudentColumn::as_str).collect();
        let mut sql = format!("SELECT {} FROM {}", list.join(", "), STUDENTS.name);
        sql.push_str(&self.where_clause(&mut binds));

        if !self.order.is_empty() {
            let keys: Vec<String> = self
                .order
                .iter()
                .map(|(column, direction)| format!("{column} {}", direction.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
            sql.push_str(", rowid ASC");
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            binds.push(Value::Integer(i64::from(limit)));
        }

        CompiledQuery { sql, binds }
    }

    /// Compile a `SELECT` of every column.
    #[must_use]
    pub fn compile_select_all(&self) -> CompiledQuery {
        self.compile_select(&StudentColumn::ALL)
    }

    /// Compile `SELECT COUNT(id)` over the filtered rows.
    ///
    /// Ordering and limit do not apply to the count.
    #[must_use]
    pub fn compile_count(&self) -> CompiledQuery {
        let mut binds = Vec::new();
        let mut sql = format!("SELECT COUNT(id) FROM {}", STUDENTS.name);
        sql.push_str(&self.where_clause(&mut binds));
        CompiledQuery { sql, binds }
    }

    /// Compile a `DELETE` of the filtered rows.
    ///
    /// Ordering and limit do not apply to deletes.
    #[must_use]
    pub fn compile_delete(&self) -> CompiledQuery {
        let mut binds = Vec::new();
        let mut sql = format!("DELETE FROM {}", STUDENTS.name);
        sql.push_str(&self.where_clause(&mut binds));
        CompiledQuery { sql, binds }
    }

    /// Compile an `UPDATE` of the filtered rows.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidQuery`] if the expression is invalid for
    /// its column (see [`UpdateExpr::validate`]).
    pub fn compile_update(&self, expr: &UpdateExpr) -> Result<CompiledQuery, StorageError> {
        expr.validate()?;

        let mut binds = Vec::new();
        let assignment = match expr {
            UpdateExpr::Set { column, value } => {
                binds.push(value.clone());
                format!("{column} = ?")
            }
            UpdateExpr::Add { column, amount } => {
                binds.push(Value::Integer(*amount));
                format!("{column} = {column} + ?")
            }
        };

        let mut sql = format!("UPDATE {} SET {assignment}", STUDENTS.name);
        sql.push_str(&self.where_clause(&mut binds));
        Ok(CompiledQuery { sql, binds })
    }

    fn where_clause(&self, binds: &mut Vec<Value>) -> String {
        if self.filters.is_empty() {
            return String::new();
        }

        let predicates: Vec<String> = self
            .filters
            .iter()
            .map(|filter| match filter {
                Filter::Eq(column, Value::Null) => format!("{column} IS NULL"),
                Filter::Eq(column, value) => {
                    binds.push(value.clone());
                    format!("{column} = ?")
                }
                Filter::Like(column, pattern) => {
                    binds.push(Value::Text(pattern.clone()));
                    format!("{column} LIKE ?")
                }
            })
            .collect();

        format!(" WHERE {}", predicates.join(" AND "))
    }
}

/// Set-based update applied to every matching row without loading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateExpr {
    /// `column = value`
    Set {
        /// Assigned column.
        column: StudentColumn,
        /// New value.
        value: Value,
    },
    /// `column = column + amount`
    Add {
        /// Integer column.
        column: StudentColumn,
        /// Increment (may be negative).
        amount: i64,
    },
}

impl UpdateExpr {
    /// `column = value`.
    #[must_use]
    pub fn set(column: StudentColumn, value: impl Into<Value>) -> Self {
        Self::Set {
            column,
            value: value.into(),
        }
    }

    /// `column = column + amount`.
    #[must_use]
    pub const fn add(column: StudentColumn, amount: i64) -> Self {
        Self::Add { column, amount }
    }

    /// Check the expression against its column.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidQuery`] if the expression assigns `id`,
    /// increments a non-integer column, sets a value of the wrong type, or sets
    /// `NULL` on a column the entity requires.
    pub fn validate(&self) -> Result<(), StorageError> {
        let column = match self {
            Self::Set { column, .. } | Self::Add { column, .. } => *column,
        };
        if column == StudentColumn::Id {
            return Err(StorageError::InvalidQuery {
                message: "id is assigned by the store and cannot be updated".into(),
            });
        }

        match self {
            Self::Add { column, .. } if !column.is_integer() => Err(StorageError::InvalidQuery {
                message: format!("cannot increment non-integer column {column}"),
            }),
            Self::Set { column, value } if !value_fits(*column, value) => {
                Err(StorageError::InvalidQuery {
                    message: format!("value {value:?} does not fit column {column}"),
                })
            }
            _ => Ok(()),
        }
    }
}

const fn value_fits(column: StudentColumn, value: &Value) -> bool {
    match value {
        Value::Null => column.is_nullable(),
        Value::Integer(_) => column.is_integer(),
        Value::DateTime(_) => column.is_datetime(),
        Value::Text(_) => !column.is_integer() && !column.is_datetime(),
    }
}
