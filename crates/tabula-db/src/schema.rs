use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::value::Value;

/// Defines the schema of a relational table, including its name and column definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// The name of the table.
    pub name: String,
    /// Ordered list of column definitions.
    pub columns: Vec<ColumnDef>,
}

/// Defines a single column within a table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// The column name.
    pub name: String,
    /// The logical type of the column.
    pub col_type: ColumnType,
    /// Whether the column accepts NULL values.
    pub nullable: bool,
    /// Whether this column is (part of) the primary key.
    pub primary_key: bool,
    /// Whether the engine assigns increasing ids. Only valid on a sole
    /// `Integer` primary key.
    #[serde(default)]
    pub autoincrement: bool,
}

/// Logical column types.
///
/// Each type maps to a declared SQLite type:
/// - `Integer` -> INTEGER
/// - `Float` -> REAL
/// - `Text` -> TEXT
/// - `Boolean` -> BOOLEAN (stored as 0/1)
/// - `Timestamp` -> TIMESTAMP (stored as RFC 3339 text, UTC)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
}

impl ColumnType {
    /// Returns the declared SQL type for this column type.
    pub fn to_sqlite_type(self) -> &'static str {
        match self {
            ColumnType::Integer   => "INTEGER",
            ColumnType::Float     => "REAL",
            ColumnType::Text      => "TEXT",
            ColumnType::Boolean   => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }

    /// Map a declared type found by reflection back to a column type.
    ///
    /// Follows SQLite's affinity rules loosely; anything unrecognised is text.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        if upper.starts_with("BOOL") {
            ColumnType::Boolean
        } else if upper.contains("INT") {
            ColumnType::Integer
        } else if upper.contains("TIMESTAMP") || upper.contains("DATE") {
            ColumnType::Timestamp
        } else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL"]
            .iter()
            .any(|t| upper.contains(t))
        {
            ColumnType::Float
        } else {
            ColumnType::Text
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Integer   => write!(f, "integer"),
            ColumnType::Float     => write!(f, "float"),
            ColumnType::Text      => write!(f, "text"),
            ColumnType::Boolean   => write!(f, "boolean"),
            ColumnType::Timestamp => write!(f, "timestamp"),
        }
    }
}

impl ColumnDef {
    /// A nullable, non-key column.
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
            nullable: true,
            primary_key: false,
            autoincrement: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as (part of) the primary key. Key columns are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// An engine-assigned integer key; implies [`primary_key`](Self::primary_key).
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self.primary_key()
    }

    /// Check `value` against the declared type, returning the value to bind.
    ///
    /// NULL is accepted for nullable columns, and for integer keys when
    /// `key_null_ok` is set (the engine assigns the row id on insert).
    pub fn bind(&self, table: &str, value: &Value, key_null_ok: bool) -> Result<Value, DbError> {
        if value.is_null() {
            let engine_assigned = key_null_ok && self.primary_key && self.col_type == ColumnType::Integer;
            return if self.nullable || engine_assigned {
                Ok(Value::Null)
            } else {
                Err(self.mismatch(table, value))
            };
        }
        value
            .coerce(self.col_type)
            .ok_or_else(|| self.mismatch(table, value))
    }

    pub(crate) fn mismatch(&self, table: &str, value: &Value) -> DbError {
        DbError::TypeMismatch {
            table: table.to_string(),
            column: self.name.clone(),
            expected: self.col_type,
            got: value.type_name().to_string(),
        }
    }
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Like [`column`](Self::column), failing with `UnknownColumn`.
    pub fn require_column(&self, name: &str) -> Result<&ColumnDef, DbError> {
        self.column(name)
            .ok_or_else(|| DbError::unknown_column(&self.name, name))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Primary-key columns in declaration order.
    pub fn primary_key(&self) -> Vec<&ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Returns [`DbError::InvalidSchema`] if the table has no name or columns,
    /// duplicate or empty column names, or a misplaced `autoincrement`.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.name.trim().is_empty() {
            return Err(DbError::InvalidSchema("Table name must not be empty".into()));
        }
        if self.columns.is_empty() {
            return Err(DbError::InvalidSchema(
                "Table must have at least one column".into(),
            ));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if col.name.trim().is_empty() {
                return Err(DbError::InvalidSchema(format!(
                    "Empty column name in table {}",
                    self.name
                )));
            }
            if !seen.insert(col.name.as_str()) {
                return Err(DbError::InvalidSchema(format!(
                    "Duplicate column name: {}",
                    col.name
                )));
            }
        }

        let key_count = self.primary_key().len();
        for col in self.columns.iter().filter(|c| c.autoincrement) {
            if col.col_type != ColumnType::Integer || !col.primary_key || key_count != 1 {
                return Err(DbError::InvalidSchema(format!(
                    "Column {} can only autoincrement as the sole integer primary key",
                    col.name
                )));
            }
        }
        Ok(())
    }
}
