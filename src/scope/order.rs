//! Order scope
//!
//! Rewrites ordering clauses referencing virtual columns into
//! value-store sort keys, preserving direction. Like filtering,
//! ordering requires the column to be searchable.

use crate::query::{Query, VirtualOrder};
use crate::registry::Toolbox;

use super::{QueryScope, QueryScopeContext, ScopeError, ScopeResult};

/// Rewrites the order clause
pub struct OrderScope;

impl QueryScope for OrderScope {
    fn name(&self) -> &'static str {
        "order"
    }

    fn scope(
        &self,
        query: &mut Query,
        ctx: &mut QueryScopeContext,
        toolbox: &Toolbox,
    ) -> ScopeResult<()> {
        let attributes = toolbox.attributes(ctx.bundle.as_deref())?;

        let order = std::mem::take(&mut query.order);
        let mut remaining = Vec::with_capacity(order.len());
        for spec in order {
            let column = query.column_name(&spec.field);
            match attributes.get(column) {
                Some(definition) => {
                    if !definition.searchable {
                        return Err(ScopeError::NotSearchable {
                            column: column.to_string(),
                        });
                    }
                    query.virtual_order.push(VirtualOrder {
                        attribute_id: definition.id,
                        slot: definition.attr_type.slot(),
                        direction: spec.direction,
                    });
                }
                None => remaining.push(spec),
            }
        }
        query.order = remaining;
        Ok(())
    }
}
