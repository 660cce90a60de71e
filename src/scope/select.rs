//! Select scope
//!
//! Detects virtual columns in the select clause (bare or qualified,
//! aliased or not), removes them so the backend only sees native
//! columns, and records the requested output name -> virtual column
//! mapping for the hydration pipeline. An empty select clause means
//! "all columns": the clause stays untouched and the context is marked
//! select-all.

use crate::query::Query;
use crate::registry::Toolbox;

use super::{QueryScope, QueryScopeContext, ScopeResult};

/// Rewrites the select clause
pub struct SelectScope;

impl QueryScope for SelectScope {
    fn name(&self) -> &'static str {
        "select"
    }

    fn scope(
        &self,
        query: &mut Query,
        ctx: &mut QueryScopeContext,
        toolbox: &Toolbox,
    ) -> ScopeResult<()> {
        if query.select.is_empty() {
            ctx.select_all = true;
            return Ok(());
        }

        let attributes = toolbox.attributes(ctx.bundle.as_deref())?;

        let items = std::mem::take(&mut query.select);
        let mut remaining = Vec::with_capacity(items.len());
        for item in items {
            let column = query.column_name(&item.field);
            if attributes.contains_key(column) {
                ctx.selected
                    .insert(item.output_name().to_string(), column.to_string());
            } else {
                remaining.push(item);
            }
        }
        query.select = remaining;
        Ok(())
    }
}
