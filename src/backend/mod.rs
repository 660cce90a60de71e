//! Relational backend interface
//!
//! The layer consumes relational storage through the `Backend` and
//! `Transaction` traits: plain selects on the read path, transactional
//! insert/update/delete on the write path. Rows travel as JSON objects
//! keyed by column name.
//!
//! `MemoryBackend` is the in-process implementation used by the tests and
//! the administrative CLI. A SQL-backed implementation would translate
//! the query AST (including its value-store sub-conditions) into joins or
//! EXISTS subqueries; the memory backend evaluates them directly.

mod errors;
mod memory;

pub use errors::{BackendError, BackendResult};
pub use memory::MemoryBackend;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::{Predicate, Query};

/// One row, keyed by column name
pub type Row = Map<String, Value>;

/// Row-level locking request for transactional selects.
///
/// Backends without row-locking support ignore `ForUpdate`; the write
/// path then degrades to unprotected read-modify-write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    /// Plain read
    None,
    /// Lock matching rows for the duration of the transaction
    ForUpdate,
}

/// Physical description of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Native column names
    pub columns: Vec<String>,
    /// Primary-key column names, in key order
    pub primary_key: Vec<String>,
}

impl TableSchema {
    /// Creates a table schema
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        primary_key: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key,
        }
    }

    /// Returns true if `column` is a native column of this table
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Relational storage consumed by the layer
pub trait Backend: Send + Sync {
    /// Returns the physical description of `table`
    fn table_schema(&self, table: &str) -> BackendResult<TableSchema>;

    /// Executes a read-only query
    fn select(&self, query: &Query) -> BackendResult<Vec<Row>>;

    /// Opens a transaction; dropping it without commit rolls back
    fn begin(&self) -> BackendResult<Box<dyn Transaction + '_>>;

    /// Whether `RowLock::ForUpdate` is honored
    fn supports_row_locking(&self) -> bool {
        false
    }
}

/// One open transaction
pub trait Transaction {
    /// Executes a query against the transaction's view
    fn select(&mut self, query: &Query, lock: RowLock) -> BackendResult<Vec<Row>>;

    /// Inserts one row
    fn insert(&mut self, table: &str, row: Row) -> BackendResult<()>;

    /// Updates matching rows with the given column changes; returns the
    /// number of rows touched
    fn update(&mut self, table: &str, filter: &[Predicate], changes: Row) -> BackendResult<usize>;

    /// Deletes matching rows; returns the number of rows removed
    fn delete(&mut self, table: &str, filter: &[Predicate]) -> BackendResult<usize>;

    /// Makes the transaction's changes durable
    fn commit(self: Box<Self>) -> BackendResult<()>;
}

/// Derives the entity id of a row: primary-key values joined with `:` in
/// declared key order. Returns `None` when a key column is absent or
/// null.
pub fn composite_entity_id(primary_key: &[String], props: &Map<String, Value>) -> Option<String> {
    let mut parts = Vec::with_capacity(primary_key.len());
    for key in primary_key {
        let value = props.get(key)?;
        let part = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        parts.push(part);
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(":"))
}
