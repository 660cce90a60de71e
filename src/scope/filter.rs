//! Where scope
//!
//! Rewrites filter conditions referencing virtual columns into
//! value-store sub-conditions: an existence check keyed by attribute id
//! with the comparison literal marshalled to the attribute's canonical
//! type. The operator and boolean combinator are preserved. Columns not
//! marked searchable are rejected before any query executes.

use crate::query::{Query, VirtualFilter};
use crate::registry::Toolbox;

use super::{QueryScope, QueryScopeContext, ScopeError, ScopeResult};

/// Rewrites the where clause
pub struct WhereScope;

impl QueryScope for WhereScope {
    fn name(&self) -> &'static str {
        "where"
    }

    fn scope(
        &self,
        query: &mut Query,
        ctx: &mut QueryScopeContext,
        toolbox: &Toolbox,
    ) -> ScopeResult<()> {
        let attributes = toolbox.attributes(ctx.bundle.as_deref())?;

        let predicates = std::mem::take(&mut query.predicates);
        let mut remaining = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            let column = query.column_name(&predicate.field);
            match attributes.get(column) {
                Some(definition) => {
                    if !definition.searchable {
                        return Err(ScopeError::NotSearchable {
                            column: column.to_string(),
                        });
                    }
                    let op = predicate
                        .op
                        .try_map_values(|v| toolbox.marshal(v, definition.attr_type))?;
                    query.virtual_filters.push(VirtualFilter {
                        attribute_id: definition.id,
                        slot: definition.attr_type.slot(),
                        op,
                        combinator: predicate.combinator,
                    });
                }
                None => remaining.push(predicate),
            }
        }
        query.predicates = remaining;
        Ok(())
    }
}
