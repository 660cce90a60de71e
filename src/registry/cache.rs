//! Metadata cache
//!
//! Caches loaded definition sets per (table_alias, bundle). Owned by the
//! registry and invalidated synchronously by add/drop; there is no
//! implicit global invalidation. Other processes see stale metadata
//! until their own cache is invalidated (accepted eventual-consistency
//! window).

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::definition::AttributeDefinition;

/// A loaded, name-keyed definition set
pub type DefinitionSet = Arc<BTreeMap<String, AttributeDefinition>>;

type CacheKey = (String, Option<String>);

/// Process-wide cache of definition sets
#[derive(Debug, Default)]
pub struct MetadataCache {
    inner: RwLock<HashMap<CacheKey, DefinitionSet>>,
}

impl MetadataCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached set for (table, bundle), if any
    pub fn get(&self, table_alias: &str, bundle: Option<&str>) -> Option<DefinitionSet> {
        let inner = self.inner.read().expect("metadata cache poisoned");
        inner
            .get(&(table_alias.to_string(), bundle.map(String::from)))
            .cloned()
    }

    /// Stores a loaded set for (table, bundle)
    pub fn put(&self, table_alias: &str, bundle: Option<&str>, set: DefinitionSet) {
        let mut inner = self.inner.write().expect("metadata cache poisoned");
        inner.insert((table_alias.to_string(), bundle.map(String::from)), set);
    }

    /// Invalidates the views a mutation in (table, bundle) can affect.
    ///
    /// A bundle-free definition is visible in every bundle view, so a
    /// bundle-free mutation drops all of the table's entries. A
    /// bundle-scoped mutation drops that bundle's view and the unscoped
    /// view.
    pub fn invalidate(&self, table_alias: &str, bundle: Option<&str>) {
        let mut inner = self.inner.write().expect("metadata cache poisoned");
        match bundle {
            None => inner.retain(|(table, _), _| table != table_alias),
            Some(b) => {
                inner.remove(&(table_alias.to_string(), Some(b.to_string())));
                inner.remove(&(table_alias.to_string(), None));
            }
        }
    }

    /// Number of cached entries (for tests)
    pub fn len(&self) -> usize {
        self.inner.read().expect("metadata cache poisoned").len()
    }

    /// Returns true if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::AttributeType;

    fn set_of(names: &[&str]) -> DefinitionSet {
        let mut map = BTreeMap::new();
        for name in names {
            map.insert(
                name.to_string(),
                AttributeDefinition::new("users", *name, AttributeType::String),
            );
        }
        Arc::new(map)
    }

    #[test]
    fn test_put_and_get() {
        let cache = MetadataCache::new();
        cache.put("users", None, set_of(&["a"]));
        assert!(cache.get("users", None).is_some());
        assert!(cache.get("users", Some("employee")).is_none());
        assert!(cache.get("orders", None).is_none());
    }

    #[test]
    fn test_bundle_free_invalidation_drops_whole_table() {
        let cache = MetadataCache::new();
        cache.put("users", None, set_of(&["a"]));
        cache.put("users", Some("employee"), set_of(&["a", "b"]));
        cache.put("orders", None, set_of(&["c"]));

        cache.invalidate("users", None);

        assert!(cache.get("users", None).is_none());
        assert!(cache.get("users", Some("employee")).is_none());
        assert!(cache.get("orders", None).is_some());
    }

    #[test]
    fn test_bundle_scoped_invalidation_keeps_other_bundles() {
        let cache = MetadataCache::new();
        cache.put("users", None, set_of(&["a"]));
        cache.put("users", Some("employee"), set_of(&["a", "b"]));
        cache.put("users", Some("customer"), set_of(&["a", "c"]));

        cache.invalidate("users", Some("employee"));

        assert!(cache.get("users", Some("employee")).is_none());
        assert!(cache.get("users", None).is_none());
        assert!(cache.get("users", Some("customer")).is_some());
    }
}
