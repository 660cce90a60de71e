//! Pluggable record hydrator
//!
//! The hydrator decides how resolved virtual values land on a record.
//! Returning `None` drops the record from the result set; the pipeline
//! maps every record first and filters afterwards, so a dropping
//! hydrator never mutates the collection being iterated.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::record::Record;

/// Strategy applied to each record with its resolved virtual values
pub trait Hydrator: Send + Sync {
    /// Attaches `values` to `record`; `None` removes the record from
    /// the result set
    fn hydrate(&self, record: Record, values: &BTreeMap<String, Value>) -> Option<Record>;
}

/// Attaches every resolved value under its requested output name
pub struct DefaultHydrator;

impl Hydrator for DefaultHydrator {
    fn hydrate(&self, mut record: Record, values: &BTreeMap<String, Value>) -> Option<Record> {
        for (name, value) in values {
            // Hydration must not make the record look modified
            record.attach(name.clone(), value.clone());
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_hydrator_attaches_without_dirtying() {
        let record = Record::new("users");
        let mut values = BTreeMap::new();
        values.insert("user-age".to_string(), json!(34));
        values.insert("nickname".to_string(), Value::Null);

        let hydrated = DefaultHydrator.hydrate(record, &values).unwrap();
        assert_eq!(hydrated.get("user-age"), Some(&json!(34)));
        assert_eq!(hydrated.get("nickname"), Some(&Value::Null));
        assert!(!hydrated.is_dirty());
    }
}
