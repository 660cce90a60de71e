//! The EAV layer façade
//!
//! One `EavLayer` attaches the engine to one logical table. Reads flow
//! scope chain -> backend -> hydration pipeline; writes save native
//! columns first, then reconcile virtual values and refresh cache
//! columns in the same transaction.

use std::sync::Arc;

use serde_json::Value;

use crate::backend::{Backend, Row, TableSchema, Transaction};
use crate::hydrate::HydrationPipeline;
use crate::persist::PersistencePipeline;
use crate::query::{Predicate, Query};
use crate::record::Record;
use crate::registry::{
    AttributeDefinition, ColumnSpec, DefinitionSet, MetadataCache, Toolbox, ValidationIssue,
};
use crate::scope::QueryScopeContext;

use super::config::EavConfig;
use super::errors::{EavError, EavResult};
use super::options::FindOptions;

/// EAV engine attached to one logical table
pub struct EavLayer {
    backend: Arc<dyn Backend>,
    toolbox: Toolbox,
    config: EavConfig,
}

impl EavLayer {
    /// Attaches the layer to `table` with a private metadata cache
    pub fn attach(backend: Arc<dyn Backend>, table: impl Into<String>, config: EavConfig) -> Self {
        Self::attach_with_cache(backend, table, config, Arc::new(MetadataCache::new()))
    }

    /// Attaches the layer to `table` sharing `cache` with other layers
    pub fn attach_with_cache(
        backend: Arc<dyn Backend>,
        table: impl Into<String>,
        config: EavConfig,
        cache: Arc<MetadataCache>,
    ) -> Self {
        let toolbox = Toolbox::new(backend.clone(), table, cache);
        Self {
            backend,
            toolbox,
            config,
        }
    }

    /// Returns the table-bound toolbox
    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Returns the attach-time configuration
    pub fn config(&self) -> &EavConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------

    /// Executes a find: rewrites the query through the scope chain,
    /// runs it on the backend and hydrates the result page
    pub fn find(&self, query: Query, options: &FindOptions) -> EavResult<Vec<Record>> {
        let mut query = query;
        let active = options.eav_active(self.config.enabled);

        let ctx = if active {
            self.config
                .scopes
                .apply(&mut query, options.bundle.as_deref(), &self.toolbox)?
        } else {
            QueryScopeContext::new(options.bundle.as_deref())
        };

        let table = query.table.clone();
        let rows = self.backend.select(&query)?;
        let records: Vec<Record> = rows
            .into_iter()
            .map(|row| Record::from_row(table.as_str(), row))
            .collect();

        let pipeline = HydrationPipeline::new(
            &self.toolbox,
            self.config.hydrator.as_ref(),
            &self.config.cache,
        );
        Ok(pipeline.apply(&ctx, active, records)?)
    }

    // -----------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------

    /// Saves a record: native columns first, then virtual values and
    /// cache columns, all in one transaction. Any failure rolls the
    /// whole save back.
    pub fn save(&self, record: &mut Record) -> EavResult<()> {
        let schema = self.backend.table_schema(self.toolbox.table_alias())?;

        let mut txn = self.backend.begin()?;
        self.save_native(txn.as_mut(), &schema, record)?;
        if self.config.enabled {
            PersistencePipeline::new(&self.toolbox, &self.config.cache)
                .save(txn.as_mut(), record)?;
        }
        txn.commit()?;

        record.clean();
        Ok(())
    }

    /// Deletes a record and all of its virtual values.
    ///
    /// `atomic` declares whether the caller runs the deletion in an
    /// atomic context; a non-atomic deletion of a record whose table
    /// has virtual columns is rejected before any row is touched.
    pub fn delete(&self, record: &Record, atomic: bool) -> EavResult<()> {
        if !atomic && !self.toolbox.attributes(None)?.is_empty() {
            return Err(EavError::NonAtomicDelete(
                self.toolbox.table_alias().to_string(),
            ));
        }

        let schema = self.backend.table_schema(self.toolbox.table_alias())?;
        let key_filter = key_filter(&schema, record);

        let mut txn = self.backend.begin()?;
        txn.delete(&schema.name, &key_filter)?;
        PersistencePipeline::new(&self.toolbox, &self.config.cache)
            .delete(txn.as_mut(), record)?;
        txn.commit()?;
        Ok(())
    }

    /// Writes the record's native columns: insert for new records,
    /// single-row update keyed by primary key otherwise
    fn save_native(
        &self,
        txn: &mut dyn Transaction,
        schema: &TableSchema,
        record: &Record,
    ) -> EavResult<()> {
        let mut row = Row::new();
        for column in &schema.columns {
            if let Some(value) = record.get(column) {
                row.insert(column.clone(), value.clone());
            }
        }

        if record.is_new() {
            txn.insert(&schema.name, row)?;
        } else {
            let touched = txn.update(&schema.name, &key_filter(schema, record), row.clone())?;
            if touched == 0 {
                txn.insert(&schema.name, row)?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Column administration (registry passthrough)
    // -----------------------------------------------------------------

    /// Adds or overwrites a virtual column
    pub fn add_column(&self, spec: &ColumnSpec) -> EavResult<AttributeDefinition> {
        Ok(self.toolbox.add_column(spec)?)
    }

    /// Validates a column spec, collecting every issue
    pub fn check_column(&self, spec: &ColumnSpec) -> EavResult<Vec<ValidationIssue>> {
        Ok(self.toolbox.check_column(spec)?)
    }

    /// Drops a virtual column and its values; false when absent
    pub fn drop_column(&self, name: &str, bundle: Option<&str>) -> EavResult<bool> {
        Ok(self.toolbox.drop_column(name, bundle)?)
    }

    /// Lists the virtual columns visible in `bundle`
    pub fn list_columns(&self, bundle: Option<&str>) -> EavResult<DefinitionSet> {
        Ok(self.toolbox.attributes(bundle)?)
    }
}

/// One predicate per primary-key column, combined with AND
fn key_filter(schema: &TableSchema, record: &Record) -> Vec<Predicate> {
    schema
        .primary_key
        .iter()
        .map(|key| Predicate::eq(key, record.get(key).cloned().unwrap_or(Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde_json::json;

    fn setup() -> (Arc<MemoryBackend>, EavLayer) {
        let backend = Arc::new(MemoryBackend::new());
        backend.create_table(TableSchema::new(
            "users",
            vec!["id".into(), "name".into()],
            vec!["id".into()],
        ));
        let layer = EavLayer::attach(backend.clone(), "users", EavConfig::new());
        (backend, layer)
    }

    #[test]
    fn test_save_then_find_native_only() {
        let (_backend, layer) = setup();

        let mut record = Record::new("users");
        record.set("id", json!(1));
        record.set("name", json!("Alice"));
        layer.save(&mut record).unwrap();
        assert!(!record.is_new());

        let found = layer.find(Query::new("users"), &FindOptions::new()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("name"), Some(&json!("Alice")));
    }

    #[test]
    fn test_save_updates_existing_row() {
        let (backend, layer) = setup();

        let mut record = Record::new("users");
        record.set("id", json!(1));
        record.set("name", json!("Alice"));
        layer.save(&mut record).unwrap();

        record.set("name", json!("Alicia"));
        layer.save(&mut record).unwrap();

        assert_eq!(backend.row_count("users").unwrap(), 1);
        let found = layer.find(Query::new("users"), &FindOptions::new()).unwrap();
        assert_eq!(found[0].get("name"), Some(&json!("Alicia")));
    }

    #[test]
    fn test_non_atomic_delete_without_columns_is_allowed() {
        let (_backend, layer) = setup();

        let mut record = Record::new("users");
        record.set("id", json!(1));
        record.set("name", json!("Alice"));
        layer.save(&mut record).unwrap();

        layer.delete(&record, false).unwrap();
        let found = layer.find(Query::new("users"), &FindOptions::new()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_non_atomic_delete_with_columns_is_rejected() {
        let (backend, layer) = setup();
        layer
            .add_column(&ColumnSpec::new("user-age", "integer"))
            .unwrap();

        let mut record = Record::new("users");
        record.set("id", json!(1));
        record.set("name", json!("Alice"));
        record.set("user-age", json!(34));
        layer.save(&mut record).unwrap();

        let err = layer.delete(&record, false).unwrap_err();
        assert!(matches!(err, EavError::NonAtomicDelete(_)));

        // Rejected before any row was touched
        assert_eq!(backend.row_count("users").unwrap(), 1);
        assert_eq!(
            backend.row_count(crate::store::EAV_VALUES_TABLE).unwrap(),
            1
        );
    }
}
