//! Backend error types

use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised by the relational backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Referenced table does not exist
    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    /// Referenced column does not exist on the table
    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn {
        /// Table the column was looked up on
        table: String,
        /// The missing column
        column: String,
    },

    /// A row is missing one of its table's primary-key columns
    #[error("Row of table '{0}' is missing a primary-key column")]
    MissingPrimaryKey(String),

    /// Snapshot file could not be read or written
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not valid
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
}
