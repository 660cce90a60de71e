//! Cache-holder configuration
//!
//! A cache holder is a real physical column that stores a denormalized
//! snapshot of virtual values. A table may configure several holders,
//! each covering either a fixed list of virtual-column names or the
//! wildcard "all".

use std::collections::BTreeMap;

/// Which virtual columns a holder covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSet {
    /// Every virtual column defined on the table
    All,
    /// A fixed list of virtual-column names
    Named(Vec<String>),
}

impl ColumnSet {
    /// Returns true if the set covers `name`
    pub fn covers(&self, name: &str) -> bool {
        match self {
            ColumnSet::All => true,
            ColumnSet::Named(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Configured cache holders: physical column -> covered set
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheSpec {
    holders: BTreeMap<String, ColumnSet>,
}

impl CacheSpec {
    /// No cache holders configured
    pub fn none() -> Self {
        Self::default()
    }

    /// One holder covering every virtual column
    pub fn single(column: impl Into<String>) -> Self {
        Self::none().with_holder(column, ColumnSet::All)
    }

    /// Adds a holder
    pub fn with_holder(mut self, column: impl Into<String>, set: ColumnSet) -> Self {
        self.holders.insert(column.into(), set);
        self
    }

    /// Returns true if no holders are configured
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Iterates over (column, set) pairs in column order
    pub fn holders(&self) -> impl Iterator<Item = (&str, &ColumnSet)> {
        self.holders.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns true if `column` is a configured holder
    pub fn is_holder(&self, column: &str) -> bool {
        self.holders.contains_key(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_covers_everything() {
        assert!(ColumnSet::All.covers("anything"));
    }

    #[test]
    fn test_named_set_covers_only_listed() {
        let set = ColumnSet::Named(vec!["email-virtual".into()]);
        assert!(set.covers("email-virtual"));
        assert!(!set.covers("user-age"));
    }

    #[test]
    fn test_single_is_one_wildcard_holder() {
        let spec = CacheSpec::single("contact_info");
        assert!(spec.is_holder("contact_info"));
        assert_eq!(spec.holders().count(), 1);
        let (_, set) = spec.holders().next().unwrap();
        assert_eq!(set, &ColumnSet::All);
    }

    #[test]
    fn test_empty_spec() {
        assert!(CacheSpec::none().is_empty());
        assert!(!CacheSpec::none().is_holder("contact_info"));
    }
}
