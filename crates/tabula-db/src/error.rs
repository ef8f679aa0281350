use thiserror::Error;

use crate::schema::ColumnType;

/// Coarse error category, stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Driver unsupported, or the engine could not be opened or closed.
    Connection,
    /// Table or column existence conflicts, invalid table definitions.
    Schema,
    /// Malformed request: missing mutation filter, bad aggregate/order spec.
    Validation,
    /// A value is incompatible with the declared column type.
    TypeMismatch,
    /// Any other failure reported by the engine.
    Engine,
    /// Malformed tabular or JSON input.
    Serialization,
}

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// The requested table does not exist.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// The table definition is invalid (e.g., no columns, duplicate names).
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("{operation} on '{table}' requires a filter; set all_rows to affect every row")]
    MissingFilterForMutation {
        table: String,
        operation: &'static str,
    },

    #[error("Invalid query: {0}")]
    Validation(String),

    #[error("Type mismatch for column '{column}' in table '{table}': expected {expected}, got {got}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: ColumnType,
        got: String,
    },

    /// A result cell could not be turned into a [`Value`](crate::Value).
    #[error("Cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// An error originating from the underlying SQLite database.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Connection(_) => ErrorKind::Connection,
            DbError::TableNotFound(_)
            | DbError::TableExists(_)
            | DbError::UnknownColumn { .. }
            | DbError::InvalidSchema(_) => ErrorKind::Schema,
            DbError::MissingFilterForMutation { .. } | DbError::Validation(_) => {
                ErrorKind::Validation
            }
            DbError::TypeMismatch { .. } | DbError::Decode { .. } => ErrorKind::TypeMismatch,
            DbError::Sqlite(_) => ErrorKind::Engine,
            DbError::SerializationError(_) => ErrorKind::Serialization,
        }
    }

    pub(crate) fn unknown_column(table: &str, column: &str) -> Self {
        DbError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<tabula_config::ConfigError> for DbError {
    fn from(e: tabula_config::ConfigError) -> Self {
        Self::Connection(e.to_string())
    }
}
