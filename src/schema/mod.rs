//! Declarative table descriptions.
//!
//! A [`TableSchema`] lists a table's columns, named constraints and secondary
//! indexes. [`TableSchema::create_statements`] renders it into the DDL that
//! [`crate::storage::StudentStore::create_schema`] executes, so the mapping from
//! entity to table is plain data rather than reflection.
//!
//! [`STUDENTS`] describes the `students` table backing [`crate::model::Student`].

use std::fmt::{self, Display};

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit integer.
    Integer,
    /// Text with an optional declared maximum length.
    Text {
        /// Declared length limit (informational in `SQLite`).
        max_len: Option<u32>,
    },
    /// Date-time stored as `TEXT`.
    DateTime,
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("INTEGER"),
            Self::Text { max_len: None } => f.write_str("VARCHAR"),
            Self::Text { max_len: Some(n) } => write!(f, "VARCHAR({n})"),
            Self::DateTime => f.write_str("DATETIME"),
        }
    }
}

/// A single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: &'static str,
    /// Storage type.
    pub ty: ColumnType,
    /// Whether `NULL` is accepted.
    pub nullable: bool,
}

impl ColumnDef {
    /// Nullable column of the given type.
    #[must_use]
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
        }
    }

    /// Mark the column `NOT NULL`.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

impl Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.ty)?;
        if !self.nullable {
            f.write_str(" NOT NULL")?;
        }
        Ok(())
    }
}

/// Named table-level constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableConstraint {
    /// Primary key over the given columns.
    PrimaryKey {
        /// Constraint name.
        name: &'static str,
        /// Key columns.
        columns: &'static [&'static str],
    },
    /// Uniqueness over the given columns.
    Unique {
        /// Constraint name.
        name: &'static str,
        /// Unique columns.
        columns: &'static [&'static str],
    },
    /// Boolean SQL expression every row must satisfy.
    Check {
        /// Constraint name.
        name: &'static str,
        /// SQL expression.
        expr: &'static str,
    },
}

impl TableConstraint {
    /// Constraint name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PrimaryKey { name, .. }
            | Self::Unique { name, .. }
            | Self::Check { name, .. } => *name,
        }
    }
}

impl Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryKey { name, columns } => {
                write!(f, "CONSTRAINT {name} PRIMARY KEY ({})", columns.join(", "))
            }
            Self::Unique { name, columns } => {
                write!(f, "CONSTRAINT {name} UNIQUE ({})", columns.join(", "))
            }
            Self::Check { name, expr } => write!(f, "CONSTRAINT {name} CHECK ({expr})"),
        }
    }
}

/// Secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    /// Index name.
    pub name: &'static str,
    /// Indexed columns.
    pub columns: &'static [&'static str],
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

/// Full description of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: &'static str,
    /// Columns in declaration order.
    pub columns: &'static [ColumnDef],
    /// Table-level constraints.
    pub constraints: &'static [TableConstraint],
    /// Secondary indexes.
    pub indexes: &'static [IndexDef],
}

impl TableSchema {
    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of all columns in declaration order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Render the `CREATE TABLE` statement.
    #[must_use]
    pub fn create_table_sql(&self) -> String {
        let body: Vec<String> = self
            .columns
            .iter()
            .map(ToString::to_string)
            .chain(self.constraints.iter().map(ToString::to_string))
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            body.join(",\n    ")
        )
    }

    /// Render the `CREATE INDEX` statements.
    #[must_use]
    pub fn create_index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|index| {
                let unique = if index.unique { "UNIQUE " } else { "" };
                format!(
                    "CREATE {unique}INDEX IF NOT EXISTS {} ON {} ({})",
                    index.name,
                    self.name,
                    index.columns.join(", ")
                )
            })
            .collect()
    }

    /// All statements needed to materialise the table, table first.
    #[must_use]
    pub fn create_statements(&self) -> Vec<String> {
        let mut statements = vec![self.create_table_sql()];
        statements.extend(self.create_index_sql());
        statements
    }
}

/// Lowest accepted grade.
pub const MIN_GRADE: i64 = 1;

/// Highest accepted grade.
pub const MAX_GRADE: i64 = 12;

/// Declared maximum email length.
pub const EMAIL_MAX_LEN: u32 = 55;

/// The `students` table.
pub const STUDENTS: TableSchema = TableSchema {
    name: "students",
    columns: &[
        ColumnDef::new("id", ColumnType::Integer).not_null(),
        ColumnDef::new("name", ColumnType::Text { max_len: None }),
        ColumnDef::new(
            "email",
            ColumnType::Text {
                max_len: Some(EMAIL_MAX_LEN),
            },
        ),
        ColumnDef::new("grade", ColumnType::Integer),
        ColumnDef::new("birthday", ColumnType::DateTime),
        ColumnDef::new("enrolled_date", ColumnType::DateTime),
    ],
    constraints: &[
        TableConstraint::PrimaryKey {
            name: "id_pk",
            columns: &["id"],
        },
        TableConstraint::Unique {
            name: "unique_email",
            columns: &["email"],
        },
        TableConstraint::Check {
            name: "grade_between_1_and_12",
            expr: "grade BETWEEN 1 AND 12",
        },
    ],
    indexes: &[IndexDef {
        name: "index_name",
        columns: &["name"],
        unique: false,
    }],
};
