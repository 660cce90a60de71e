//! Registry toolbox
//!
//! One `Toolbox` instance is bound to one logical table. It loads and
//! caches that table's virtual-column definitions, resolves entity
//! identity, and fronts the type marshaller for the pipelines.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::backend::{composite_entity_id, Backend};
use crate::marshal::{self, AttributeType, MarshalResult};
use crate::query::{Predicate, Query};
use crate::record::Record;

use super::cache::{DefinitionSet, MetadataCache};
use super::definition::{AttributeDefinition, EAV_ATTRIBUTES_TABLE};
use super::errors::{RegistryError, RegistryResult};

/// Table-bound registry access
pub struct Toolbox {
    backend: Arc<dyn Backend>,
    table_alias: String,
    cache: Arc<MetadataCache>,
}

impl Toolbox {
    /// Binds a toolbox to `table_alias`
    pub fn new(
        backend: Arc<dyn Backend>,
        table_alias: impl Into<String>,
        cache: Arc<MetadataCache>,
    ) -> Self {
        Self {
            backend,
            table_alias: table_alias.into(),
            cache,
        }
    }

    /// Returns the bound table name
    pub fn table_alias(&self) -> &str {
        &self.table_alias
    }

    /// Returns the shared backend handle
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Returns the shared metadata cache
    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// Loads the table's definitions visible in `bundle`, name-keyed.
    ///
    /// `None` is the unscoped view (every definition of the table);
    /// a concrete bundle sees bundle-free definitions plus its own.
    /// Results are cached per (table_alias, bundle) until an add or drop
    /// invalidates them.
    pub fn attributes(&self, bundle: Option<&str>) -> RegistryResult<DefinitionSet> {
        if let Some(hit) = self.cache.get(&self.table_alias, bundle) {
            return Ok(hit);
        }

        let query = Query::new(EAV_ATTRIBUTES_TABLE)
            .filter(Predicate::eq("table_alias", json!(self.table_alias)));
        let rows = self.backend.select(&query)?;

        let mut set = BTreeMap::new();
        for row in &rows {
            let def = AttributeDefinition::from_row(row)?;
            if def.applies_to(bundle) {
                set.insert(def.name.clone(), def);
            }
        }

        let set: DefinitionSet = Arc::new(set);
        self.cache.put(&self.table_alias, bundle, Arc::clone(&set));
        Ok(set)
    }

    /// Normalizes a user-supplied type alias to a canonical type
    pub fn map_type(raw: &str) -> RegistryResult<AttributeType> {
        AttributeType::from_alias(raw).ok_or_else(|| RegistryError::unknown_type(raw))
    }

    /// Returns the canonical type of a virtual column, or `None` if the
    /// name is not a virtual column of this table
    pub fn get_type(&self, name: &str) -> RegistryResult<Option<AttributeType>> {
        Ok(self.attributes(None)?.get(name).map(|d| d.attr_type))
    }

    /// Derives the entity id of a record from its primary-key properties
    pub fn entity_id(&self, record: &Record) -> RegistryResult<String> {
        let schema = self.backend.table_schema(&self.table_alias)?;
        composite_entity_id(&schema.primary_key, record.properties())
            .ok_or_else(|| RegistryError::missing_primary_key(&self.table_alias))
    }

    /// Extracts entity ids for a batch of records, in record order with
    /// duplicates removed
    pub fn extract_entity_ids(&self, records: &[Record]) -> RegistryResult<Vec<String>> {
        let schema = self.backend.table_schema(&self.table_alias)?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = composite_entity_id(&schema.primary_key, record.properties())
                .ok_or_else(|| RegistryError::missing_primary_key(&self.table_alias))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Returns true if the record carries the property (even if null)
    pub fn property_exists(&self, record: &Record, name: &str) -> bool {
        record.has(name)
    }

    /// Coerces a raw value to the canonical form of `ty`
    pub fn marshal(&self, raw: &Value, ty: AttributeType) -> MarshalResult<Value> {
        marshal::marshal(raw, ty)
    }
}
