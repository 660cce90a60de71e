//! Attribute definition rows
//!
//! One `AttributeDefinition` describes one virtual column of one logical
//! table. Definitions live in the `eav_attributes` metadata table:
//!
//! ```text
//! eav_attributes(id PK, table_alias, bundle NULL, name, type,
//!                searchable DEFAULT true, extra NULL)
//! ```
//!
//! `(table_alias, bundle, name)` identifies a definition; a NULL bundle
//! means the column applies to every bundle of the table.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::{Row, TableSchema};
use crate::marshal::AttributeType;

use super::errors::{RegistryError, RegistryResult};

/// Name of the metadata table
pub const EAV_ATTRIBUTES_TABLE: &str = "eav_attributes";

/// Physical schema of the metadata table
pub fn attributes_table_schema() -> TableSchema {
    TableSchema::new(
        EAV_ATTRIBUTES_TABLE,
        vec![
            "id".into(),
            "table_alias".into(),
            "bundle".into(),
            "name".into(),
            "type".into(),
            "searchable".into(),
            "extra".into(),
        ],
        vec!["id".into()],
    )
}

/// One virtual column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Unique definition id
    pub id: Uuid,
    /// Owning table name
    pub table_alias: String,
    /// Optional sub-scope; `None` applies to all bundles
    pub bundle: Option<String>,
    /// Column name, unique within (table_alias, bundle)
    pub name: String,
    /// Canonical value type
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Whether the column may appear in filter and order clauses
    pub searchable: bool,
    /// Opaque configuration blob
    pub extra: Option<Value>,
}

impl AttributeDefinition {
    /// Creates a definition with a fresh id, searchable by default
    pub fn new(
        table_alias: impl Into<String>,
        name: impl Into<String>,
        attr_type: AttributeType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            table_alias: table_alias.into(),
            bundle: None,
            name: name.into(),
            attr_type,
            searchable: true,
            extra: None,
        }
    }

    /// Scopes the definition to a bundle
    pub fn with_bundle(mut self, bundle: impl Into<String>) -> Self {
        self.bundle = Some(bundle.into());
        self
    }

    /// Sets the searchable flag
    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Attaches the opaque configuration blob
    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Returns true if this definition is visible in `bundle`.
    ///
    /// `None` asks for the unscoped view (every definition of the table);
    /// a concrete bundle sees bundle-free definitions plus its own.
    pub fn applies_to(&self, bundle: Option<&str>) -> bool {
        match (&self.bundle, bundle) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(own), Some(requested)) => own == requested,
        }
    }

    /// Converts the definition to a metadata-table row
    pub fn to_row(&self) -> Row {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct with named fields always serializes to an object
            _ => Row::new(),
        }
    }

    /// Decodes a metadata-table row
    pub fn from_row(row: &Row) -> RegistryResult<Self> {
        serde_json::from_value(Value::Object(row.clone()))
            .map_err(|e| RegistryError::malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definition_defaults() {
        let def = AttributeDefinition::new("users", "user-age", AttributeType::Integer);
        assert!(def.searchable);
        assert!(def.bundle.is_none());
        assert!(def.extra.is_none());
    }

    #[test]
    fn test_row_round_trip() {
        let def = AttributeDefinition::new("users", "user-age", AttributeType::Integer)
            .with_bundle("employee")
            .with_searchable(false)
            .with_extra(json!({"unit": "years"}));

        let row = def.to_row();
        assert_eq!(row.get("type"), Some(&json!("integer")));
        assert_eq!(row.get("bundle"), Some(&json!("employee")));

        let decoded = AttributeDefinition::from_row(&row).unwrap();
        assert_eq!(decoded, def);
    }

    #[test]
    fn test_from_row_rejects_garbage() {
        let mut row = Row::new();
        row.insert("id".into(), json!("not-a-uuid"));
        assert!(AttributeDefinition::from_row(&row).is_err());
    }

    #[test]
    fn test_bundle_visibility() {
        let unscoped = AttributeDefinition::new("users", "a", AttributeType::String);
        let scoped = AttributeDefinition::new("users", "b", AttributeType::String)
            .with_bundle("employee");

        // Bundle-free definitions apply everywhere
        assert!(unscoped.applies_to(None));
        assert!(unscoped.applies_to(Some("employee")));

        // Scoped definitions apply to their bundle and the unscoped view
        assert!(scoped.applies_to(Some("employee")));
        assert!(scoped.applies_to(None));
        assert!(!scoped.applies_to(Some("customer")));
    }

    #[test]
    fn test_metadata_table_schema_covers_definition_row() {
        let schema = attributes_table_schema();
        let def = AttributeDefinition::new("users", "user-age", AttributeType::Integer);
        for column in def.to_row().keys() {
            assert!(schema.has_column(column), "missing column {}", column);
        }
    }
}
