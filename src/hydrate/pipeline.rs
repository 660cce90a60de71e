//! Hydration pipeline
//!
//! Post-fetch transform attaching virtual values to a page of records.
//! Runs after the backend returns rows and before anything that expects
//! virtual properties to be present. Stages:
//!
//! 1. status check: an inactive call passes records through untouched
//! 2. column resolution: the scope context says which virtual columns
//!    were requested (or all, for a select-all query)
//! 3. batched fetch: one value-store query for the whole page
//! 4. gap-filling: every requested column resolves on every record,
//!    to null when no row exists
//! 5. hydrator: map each record to `Option<Record>`, then filter
//! 6. cache decode: configured holder columns decode to snapshots,
//!    malformed cells degrade to the empty snapshot

use std::collections::BTreeMap;

use serde_json::Value;
use uuid::Uuid;

use crate::cachecol::{decode, CacheSpec, CachedColumn};
use crate::observability::{Logger, Severity};
use crate::record::Record;
use crate::registry::{AttributeDefinition, Toolbox};
use crate::scope::QueryScopeContext;
use crate::store::ValueStore;

use super::errors::HydrateResult;
use super::hydrator::Hydrator;

/// Attaches virtual values to fetched records
pub struct HydrationPipeline<'a> {
    toolbox: &'a Toolbox,
    hydrator: &'a dyn Hydrator,
    cache: &'a CacheSpec,
}

impl<'a> HydrationPipeline<'a> {
    /// Creates a pipeline for the toolbox's table
    pub fn new(toolbox: &'a Toolbox, hydrator: &'a dyn Hydrator, cache: &'a CacheSpec) -> Self {
        Self {
            toolbox,
            hydrator,
            cache,
        }
    }

    /// Runs the pipeline over one page of records.
    ///
    /// `active` is the resolved status for this call (per-call override
    /// beats the standing flag); an inactive pipeline is a passthrough.
    pub fn apply(
        &self,
        ctx: &QueryScopeContext,
        active: bool,
        records: Vec<Record>,
    ) -> HydrateResult<Vec<Record>> {
        if !active {
            return Ok(records);
        }

        let attributes = self.toolbox.attributes(ctx.bundle.as_deref())?;

        // Requested output name -> definition
        let expected: Vec<(String, &AttributeDefinition)> = if ctx.select_all {
            attributes.iter().map(|(n, d)| (n.clone(), d)).collect()
        } else {
            ctx.selected
                .iter()
                .filter_map(|(output, name)| attributes.get(name).map(|d| (output.clone(), d)))
                .collect()
        };

        let mut records = records;
        if !expected.is_empty() && !records.is_empty() {
            records = self.attach_values(&expected, records)?;
        }
        if !self.cache.is_empty() {
            for record in &mut records {
                self.decode_cache_columns(record);
            }
        }
        Ok(records)
    }

    /// One batched fetch for the page, grouped by entity, then the
    /// map-then-filter hydrator pass
    fn attach_values(
        &self,
        expected: &[(String, &AttributeDefinition)],
        records: Vec<Record>,
    ) -> HydrateResult<Vec<Record>> {
        let entity_ids = self.toolbox.extract_entity_ids(&records)?;
        let attribute_ids: Vec<Uuid> = expected.iter().map(|(_, d)| d.id).collect();
        let values = ValueStore::fetch_values(
            self.toolbox.backend().as_ref(),
            &attribute_ids,
            &entity_ids,
        )?;
        let grouped = ValueStore::group_by_entity(values);
        let empty = Vec::new();

        let mut mapped = Vec::with_capacity(records.len());
        for record in records {
            let entity_id = self.toolbox.entity_id(&record)?;
            let rows = grouped.get(&entity_id).unwrap_or(&empty);

            let mut resolved = BTreeMap::new();
            for (output, definition) in expected {
                let value = rows
                    .iter()
                    .find(|v| v.attribute_id == definition.id)
                    .map(|v| v.get_typed(definition.attr_type))
                    .unwrap_or(Value::Null);
                resolved.insert(output.clone(), value);
            }
            mapped.push(self.hydrator.hydrate(record, &resolved));
        }

        // Drop the records the hydrator discarded
        Ok(mapped.into_iter().flatten().collect())
    }

    /// Decodes every configured holder column present on the record;
    /// malformed cells degrade to the empty snapshot
    fn decode_cache_columns(&self, record: &mut Record) {
        let present: Vec<String> = self
            .cache
            .holders()
            .map(|(column, _)| column.to_string())
            .filter(|column| record.has(column))
            .collect();

        for column in present {
            let cell = record.get(&column).cloned().unwrap_or(Value::Null);
            let snapshot = match decode(&cell) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    Logger::log(
                        Severity::Warn,
                        "eav.cache_decode_failed",
                        &[
                            ("table", self.toolbox.table_alias()),
                            ("column", &column),
                            ("reason", &err.to_string()),
                        ],
                    );
                    CachedColumn::empty()
                }
            };
            record.attach(column, snapshot.to_value());
        }
    }
}
