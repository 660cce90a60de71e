//! Query scopes
//!
//! Pluggable rewrite rules that detect virtual-column references in a
//! query and move them into value-store sub-conditions. The chain runs
//! in a fixed order (Select, Where, Order) so select-alias resolution is
//! available to later stages, and every scope is idempotent: once a
//! reference has been moved out of a native clause, a second application
//! finds nothing left to rewrite.

mod errors;
mod filter;
mod order;
mod select;

pub use errors::{ScopeError, ScopeResult};
pub use filter::WhereScope;
pub use order::OrderScope;
pub use select::SelectScope;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::query::Query;
use crate::registry::Toolbox;

/// Virtual-column references discovered while rewriting one query.
///
/// Ephemeral: lives for the duration of one find call.
#[derive(Debug, Clone, Default)]
pub struct QueryScopeContext {
    /// Bundle in effect for the query
    pub bundle: Option<String>,
    /// True when the query selects all columns, so every virtual column
    /// visible in the bundle is expected
    pub select_all: bool,
    /// Requested output name -> virtual column name (supports aliasing)
    pub selected: BTreeMap<String, String>,
}

impl QueryScopeContext {
    /// Creates a context for `bundle`
    pub fn new(bundle: Option<&str>) -> Self {
        Self {
            bundle: bundle.map(String::from),
            select_all: false,
            selected: BTreeMap::new(),
        }
    }
}

/// One pluggable query rewrite rule
pub trait QueryScope: Send + Sync {
    /// Scope name for diagnostics
    fn name(&self) -> &'static str;

    /// Rewrites `query` in place, recording discoveries in `ctx`
    fn scope(
        &self,
        query: &mut Query,
        ctx: &mut QueryScopeContext,
        toolbox: &Toolbox,
    ) -> ScopeResult<()>;
}

/// Ordered list of scopes applied to every find query
pub struct ScopeChain {
    scopes: Vec<Arc<dyn QueryScope>>,
}

impl ScopeChain {
    /// The standard chain: Select, Where, Order
    pub fn standard() -> Self {
        Self {
            scopes: vec![
                Arc::new(SelectScope),
                Arc::new(WhereScope),
                Arc::new(OrderScope),
            ],
        }
    }

    /// A custom chain, applied in the given order
    pub fn new(scopes: Vec<Arc<dyn QueryScope>>) -> Self {
        Self { scopes }
    }

    /// Applies every scope in order and returns the collected context
    pub fn apply(
        &self,
        query: &mut Query,
        bundle: Option<&str>,
        toolbox: &Toolbox,
    ) -> ScopeResult<QueryScopeContext> {
        let mut ctx = QueryScopeContext::new(bundle);
        for scope in &self.scopes {
            scope.scope(query, &mut ctx, toolbox)?;
        }
        Ok(ctx)
    }

    /// Number of scopes in the chain
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Returns true if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, TableSchema};
    use crate::marshal::AttributeType;
    use crate::query::{OrderSpec, Predicate, SelectItem};
    use crate::registry::{AttributeDefinition, MetadataCache, EAV_ATTRIBUTES_TABLE};
    use serde_json::json;

    fn setup() -> (Arc<MemoryBackend>, Toolbox) {
        let backend = Arc::new(MemoryBackend::new());
        backend.create_table(TableSchema::new(
            "users",
            vec!["id".into(), "name".into()],
            vec!["id".into()],
        ));
        let toolbox = Toolbox::new(backend.clone(), "users", Arc::new(MetadataCache::new()));
        (backend, toolbox)
    }

    fn seed(backend: &MemoryBackend, def: &AttributeDefinition) {
        backend.insert_row(EAV_ATTRIBUTES_TABLE, def.to_row()).unwrap();
    }

    #[test]
    fn test_standard_chain_order() {
        let chain = ScopeChain::standard();
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_chain_is_idempotent() {
        let (backend, toolbox) = setup();
        seed(
            &backend,
            &AttributeDefinition::new("users", "user-age", AttributeType::Integer),
        );

        let mut query = Query::new("users")
            .select(SelectItem::col("user-age"))
            .filter(Predicate::gte("user-age", json!(18)))
            .order_by(OrderSpec::asc("user-age"));

        let chain = ScopeChain::standard();
        chain.apply(&mut query, None, &toolbox).unwrap();
        let after_first = query.clone();

        let ctx = chain.apply(&mut query, None, &toolbox).unwrap();
        assert_eq!(query, after_first);
        assert_eq!(query.virtual_filters.len(), 1);
        assert_eq!(query.virtual_order.len(), 1);
        // The alias map is rebuilt from the query, so a second pass over
        // an already-rewritten query finds no select references
        assert!(ctx.selected.is_empty());
    }
}
