//! Batched value-store access
//!
//! All multi-row lookups are one query: the read path fetches the values
//! for a whole result page at once, never per record. Writes are
//! upserts keyed by (attribute_id, entity_id) and only ever run inside
//! the caller's transaction.

use std::collections::HashMap;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::backend::{Backend, RowLock, Transaction};
use crate::query::{Predicate, Query};
use crate::registry::AttributeDefinition;

use super::errors::StoreResult;
use super::value::{AttributeValue, EAV_VALUES_TABLE};

/// Stateless value-store operations
pub struct ValueStore;

impl ValueStore {
    /// Fetches every value row matching the attribute/entity cross set
    /// in one batched query. Empty inputs short-circuit to an empty
    /// result without touching the backend.
    pub fn fetch_values(
        backend: &dyn Backend,
        attribute_ids: &[Uuid],
        entity_ids: &[String],
    ) -> StoreResult<Vec<AttributeValue>> {
        if attribute_ids.is_empty() || entity_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = backend.select(&Self::batch_query(attribute_ids, entity_ids))?;
        rows.iter().map(AttributeValue::from_row).collect()
    }

    /// Transactional variant of `fetch_values`, with an optional row
    /// lock where the backend supports it
    pub fn fetch_values_locked(
        txn: &mut dyn Transaction,
        attribute_ids: &[Uuid],
        entity_ids: &[String],
        lock: RowLock,
    ) -> StoreResult<Vec<AttributeValue>> {
        if attribute_ids.is_empty() || entity_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = txn.select(&Self::batch_query(attribute_ids, entity_ids), lock)?;
        rows.iter().map(AttributeValue::from_row).collect()
    }

    /// Upserts one value: marshals `raw` to the attribute's canonical
    /// type, updates the existing (attribute, entity) row in place or
    /// inserts a new one. Returns the canonical value so the caller can
    /// reflect it back onto the record.
    pub fn persist_value(
        txn: &mut dyn Transaction,
        definition: &AttributeDefinition,
        entity_id: &str,
        raw: &Value,
        lock: RowLock,
    ) -> StoreResult<Value> {
        let canonical = crate::marshal::marshal(raw, definition.attr_type)?;

        let existing = Self::fetch_values_locked(
            txn,
            &[definition.id],
            &[entity_id.to_string()],
            lock,
        )?;

        match existing.into_iter().next() {
            Some(mut value) => {
                value.set_typed(definition.attr_type, &canonical)?;
                txn.update(
                    EAV_VALUES_TABLE,
                    &[Predicate::eq("id", json!(value.id))],
                    value.to_row(),
                )?;
            }
            None => {
                let mut value = AttributeValue::new(definition.id, entity_id);
                value.set_typed(definition.attr_type, &canonical)?;
                txn.insert(EAV_VALUES_TABLE, value.to_row())?;
            }
        }
        Ok(canonical)
    }

    /// Deletes every value row of the given attributes for one entity.
    /// Used when the owning record is deleted.
    pub fn delete_for_entity(
        txn: &mut dyn Transaction,
        attribute_ids: &[Uuid],
        entity_id: &str,
    ) -> StoreResult<usize> {
        if attribute_ids.is_empty() {
            return Ok(0);
        }
        let removed = txn.delete(
            EAV_VALUES_TABLE,
            &[
                Predicate::is_in(
                    "attribute_id",
                    attribute_ids.iter().map(|id| json!(id)).collect(),
                ),
                Predicate::eq("entity_id", json!(entity_id)),
            ],
        )?;
        Ok(removed)
    }

    /// Groups fetched values by entity id
    pub fn group_by_entity(values: Vec<AttributeValue>) -> HashMap<String, Vec<AttributeValue>> {
        let mut grouped: HashMap<String, Vec<AttributeValue>> = HashMap::new();
        for value in values {
            grouped.entry(value.entity_id.clone()).or_default().push(value);
        }
        grouped
    }

    fn batch_query(attribute_ids: &[Uuid], entity_ids: &[String]) -> Query {
        Query::new(EAV_VALUES_TABLE)
            .filter(Predicate::is_in(
                "attribute_id",
                attribute_ids.iter().map(|id| json!(id)).collect(),
            ))
            .filter(Predicate::is_in(
                "entity_id",
                entity_ids.iter().map(|id| json!(id)).collect(),
            ))
    }
}
