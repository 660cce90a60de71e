//! Generic record representation
//!
//! A `Record` is one row of a logical table as seen by callers: a JSON
//! property map plus dirty tracking. Virtual columns live in the same
//! property map as native ones; the hydration and persistence pipelines
//! are what keep them in sync with the value store.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A single record of a logical table
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Owning table name
    table: String,
    /// Property map (native and virtual columns)
    properties: Map<String, Value>,
    /// Names of properties modified since the last clean
    dirty: BTreeSet<String>,
    /// Whether this record has not been persisted yet
    is_new: bool,
}

impl Record {
    /// Creates an empty, unpersisted record for `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            properties: Map::new(),
            dirty: BTreeSet::new(),
            is_new: true,
        }
    }

    /// Creates a record from an already-persisted row.
    ///
    /// The record starts clean: nothing is dirty until `set` is called.
    pub fn from_row(table: impl Into<String>, row: Map<String, Value>) -> Self {
        Self {
            table: table.into(),
            properties: row,
            dirty: BTreeSet::new(),
            is_new: false,
        }
    }

    /// Returns the owning table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns a property value, if present
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Returns true if the property is present (even if null)
    pub fn has(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Sets a property and marks it dirty
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.dirty.insert(name.clone());
        self.properties.insert(name, value);
    }

    /// Sets a property without marking it dirty.
    ///
    /// Used by hydration: attaching fetched values must not make the
    /// record look modified.
    pub fn attach(&mut self, name: impl Into<String>, value: Value) {
        self.properties.insert(name.into(), value);
    }

    /// Removes a property, returning its value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.dirty.remove(name);
        self.properties.remove(name)
    }

    /// Returns the full property map
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Returns the dirty property names in deterministic order
    pub fn dirty(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(|s| s.as_str())
    }

    /// Returns true if any property was modified since the last clean
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Returns true if this record has not been persisted yet
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Marks the record clean and persisted (called after a save)
    pub fn clean(&mut self) {
        self.dirty.clear();
        self.is_new = false;
    }
}
