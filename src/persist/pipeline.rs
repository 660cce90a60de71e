//! Persistence pipeline
//!
//! Write-path reconciliation of virtual values, run inside the caller's
//! transaction after the record's native columns are saved:
//!
//! 1. load the table's definitions unscoped by bundle (a record's
//!    bundle may differ from the query that loaded it) and keep the
//!    ones present as record properties
//! 2. fetch the entity's existing value rows for that attribute set in
//!    one batch, requesting a write lock (backends without row locking
//!    ignore it and the save degrades to read-modify-write)
//! 3. update existing rows in place, insert rows for attributes saved
//!    for the first time; either way the canonicalized value is
//!    reflected back onto the record
//! 4. refresh configured cache columns in the same transaction
//!
//! The deletion counterpart removes every value row of the entity for
//! the table's attributes. Callers must reject non-atomic deletion
//! before any row is touched; the pipeline itself only ever runs
//! transactionally.

use std::collections::HashMap;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::backend::{RowLock, Transaction};
use crate::cachecol::{CacheRebuilder, CacheSpec};
use crate::query::Predicate;
use crate::record::Record;
use crate::registry::{AttributeDefinition, Toolbox};
use crate::store::{AttributeValue, ValueStore, EAV_VALUES_TABLE};

use super::errors::PersistResult;

/// Reconciles virtual values on save and delete
pub struct PersistencePipeline<'a> {
    toolbox: &'a Toolbox,
    cache: &'a CacheSpec,
}

impl<'a> PersistencePipeline<'a> {
    /// Creates a pipeline for the toolbox's table
    pub fn new(toolbox: &'a Toolbox, cache: &'a CacheSpec) -> Self {
        Self { toolbox, cache }
    }

    /// Reconciles the record's virtual properties with the value store
    pub fn save(&self, txn: &mut dyn Transaction, record: &mut Record) -> PersistResult<()> {
        let attributes = self.toolbox.attributes(None)?;
        let present: Vec<&AttributeDefinition> = attributes
            .values()
            .filter(|definition| record.has(&definition.name))
            .collect();

        if !present.is_empty() {
            let entity_id = self.toolbox.entity_id(record)?;
            let attribute_ids: Vec<Uuid> = present.iter().map(|d| d.id).collect();
            let existing = ValueStore::fetch_values_locked(
                txn,
                &attribute_ids,
                &[entity_id.clone()],
                RowLock::ForUpdate,
            )?;
            let mut by_attribute: HashMap<Uuid, AttributeValue> =
                existing.into_iter().map(|v| (v.attribute_id, v)).collect();

            for definition in present {
                let raw = record.get(&definition.name).cloned().unwrap_or(Value::Null);
                let canonical = self.toolbox.marshal(&raw, definition.attr_type)?;

                match by_attribute.remove(&definition.id) {
                    Some(mut value) => {
                        value.set_typed(definition.attr_type, &canonical)?;
                        txn.update(
                            EAV_VALUES_TABLE,
                            &[Predicate::eq("id", json!(value.id))],
                            value.to_row(),
                        )?;
                    }
                    None => {
                        let mut value = AttributeValue::new(definition.id, entity_id.as_str());
                        value.set_typed(definition.attr_type, &canonical)?;
                        txn.insert(EAV_VALUES_TABLE, value.to_row())?;
                    }
                }

                // Subsequent logic sees the coerced form
                record.set(definition.name.as_str(), canonical);
            }
        }

        CacheRebuilder::new(self.toolbox, self.cache).rebuild(txn, record)?;
        Ok(())
    }

    /// Removes every value row of the entity for the table's attributes.
    /// Returns the number of rows removed.
    pub fn delete(&self, txn: &mut dyn Transaction, record: &Record) -> PersistResult<usize> {
        let attributes = self.toolbox.attributes(None)?;
        if attributes.is_empty() {
            return Ok(0);
        }
        let attribute_ids: Vec<Uuid> = attributes.values().map(|d| d.id).collect();
        let entity_id = self.toolbox.entity_id(record)?;
        Ok(ValueStore::delete_for_entity(txn, &attribute_ids, &entity_id)?)
    }
}
