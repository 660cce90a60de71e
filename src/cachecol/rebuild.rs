//! Cache-column rebuild
//!
//! Recomputes the configured cache holders for one entity from its
//! current value rows and writes them back with single-row updates keyed
//! by the record's primary key (composite keys combined with AND).
//! Runs inside the persistence transaction so a rolled-back save never
//! leaves a refreshed cache behind.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use uuid::Uuid;

use crate::backend::{composite_entity_id, Row, RowLock, Transaction};
use crate::query::Predicate;
use crate::record::Record;
use crate::registry::Toolbox;
use crate::store::{AttributeValue, ValueStore};

use super::codec::{encode, CachedColumn};
use super::errors::CacheError;
use super::spec::CacheSpec;

/// Rebuilds cache holders for one table
pub struct CacheRebuilder<'a> {
    toolbox: &'a Toolbox,
    spec: &'a CacheSpec,
}

impl<'a> CacheRebuilder<'a> {
    /// Creates a rebuilder for the toolbox's table
    pub fn new(toolbox: &'a Toolbox, spec: &'a CacheSpec) -> Self {
        Self { toolbox, spec }
    }

    /// Recomputes every configured holder for the record's entity and
    /// persists them. Returns the holder column -> encoded blob mapping.
    /// No-op when no holders are configured.
    pub fn rebuild(
        &self,
        txn: &mut dyn Transaction,
        record: &Record,
    ) -> Result<BTreeMap<String, String>, CacheError> {
        let mut rebuilt = BTreeMap::new();
        if self.spec.is_empty() {
            return Ok(rebuilt);
        }

        let table = self.toolbox.table_alias();
        let schema = self.toolbox.backend().table_schema(table)?;
        let entity_id = composite_entity_id(&schema.primary_key, record.properties())
            .ok_or_else(|| CacheError::MissingPrimaryKey(table.to_string()))?;

        let attributes = self.toolbox.attributes(None)?;
        let attribute_ids: Vec<Uuid> = attributes.values().map(|d| d.id).collect();
        let values = ValueStore::fetch_values_locked(
            txn,
            &attribute_ids,
            &[entity_id],
            RowLock::None,
        )?;
        let by_attribute: HashMap<Uuid, AttributeValue> =
            values.into_iter().map(|v| (v.attribute_id, v)).collect();

        // One predicate per primary-key column, combined with AND
        let key_filter: Vec<Predicate> = schema
            .primary_key
            .iter()
            .map(|key| {
                Predicate::eq(key, record.get(key).cloned().unwrap_or(Value::Null))
            })
            .collect();

        for (column, set) in self.spec.holders() {
            let mut snapshot = CachedColumn::empty();
            for (name, definition) in attributes.iter() {
                if !set.covers(name) {
                    continue;
                }
                if let Some(value) = by_attribute.get(&definition.id) {
                    let typed = value.get_typed(definition.attr_type);
                    if !typed.is_null() {
                        snapshot.insert(name.clone(), typed);
                    }
                }
            }

            let encoded = encode(&snapshot);
            let mut changes = Row::new();
            changes.insert(column.to_string(), Value::String(encoded.clone()));
            txn.update(table, &key_filter, changes)?;
            rebuilt.insert(column.to_string(), encoded);
        }
        Ok(rebuilt)
    }
}
