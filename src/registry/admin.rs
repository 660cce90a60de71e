//! Metadata mutation: add and drop virtual columns
//!
//! Both operations mutate the `eav_attributes` table inside a
//! transaction and invalidate the metadata cache synchronously before
//! returning.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::backend::Row;
use crate::marshal::AttributeType;
use crate::observability::{Logger, Severity};
use crate::query::{Predicate, Query};
use crate::store::EAV_VALUES_TABLE;

use super::definition::{AttributeDefinition, EAV_ATTRIBUTES_TABLE};
use super::errors::{RegistryErrorCode, RegistryResult, ValidationIssue};
use super::toolbox::Toolbox;

/// Accepted column-name syntax: lowercase start, then lowercase
/// alphanumerics, underscores and dashes
const COLUMN_NAME_PATTERN: &str = "^[a-z][a-z0-9_-]*$";

static COLUMN_NAME_RE: OnceLock<Regex> = OnceLock::new();

/// Returns true if `name` matches the accepted column-name syntax
pub fn valid_column_name(name: &str) -> bool {
    let re = COLUMN_NAME_RE
        .get_or_init(|| Regex::new(COLUMN_NAME_PATTERN).expect("column name pattern is valid"));
    re.is_match(name)
}

/// Requested shape of a new (or overwritten) virtual column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,
    /// Type alias as supplied by the caller; normalized during add
    pub attr_type: String,
    /// Optional bundle scope
    pub bundle: Option<String>,
    /// Whether the column may appear in filter and order clauses
    pub searchable: bool,
    /// Opaque configuration blob
    pub extra: Option<Value>,
    /// Whether an existing (name, bundle) definition may be replaced
    pub overwrite: bool,
}

impl ColumnSpec {
    /// Creates a spec with defaults: no bundle, searchable, no overwrite
    pub fn new(name: impl Into<String>, attr_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr_type: attr_type.into(),
            bundle: None,
            searchable: true,
            extra: None,
            overwrite: false,
        }
    }

    /// Scopes the column to a bundle
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

    /// Permits replacing an existing definition
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl Toolbox {
    /// Validates a column spec without mutating anything.
    ///
    /// Collects every validation failure; storage failures are still
    /// hard errors.
    pub fn check_column(&self, spec: &ColumnSpec) -> RegistryResult<Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        if !valid_column_name(&spec.name) {
            issues.push(ValidationIssue::new(
                RegistryErrorCode::InvalidName,
                format!("Invalid column name '{}'", spec.name),
            ));
        }

        let schema = self.backend().table_schema(self.table_alias())?;
        if schema.has_column(&spec.name) {
            issues.push(ValidationIssue::new(
                RegistryErrorCode::NativeCollision,
                format!(
                    "Column '{}' is a native column of table '{}'",
                    spec.name,
                    self.table_alias()
                ),
            ));
        }

        if AttributeType::from_alias(&spec.attr_type).is_none() {
            issues.push(ValidationIssue::new(
                RegistryErrorCode::UnknownType,
                format!("Unknown attribute type '{}'", spec.attr_type),
            ));
        }

        if !spec.overwrite && self.find_definition(&spec.name, spec.bundle.as_deref())?.is_some() {
            let scope = match &spec.bundle {
                Some(b) => format!("bundle '{}'", b),
                None => "all bundles".to_string(),
            };
            issues.push(ValidationIssue::new(
                RegistryErrorCode::DuplicateDefinition,
                format!(
                    "Column '{}' already defined on table '{}' for {}",
                    spec.name,
                    self.table_alias(),
                    scope
                ),
            ));
        }

        Ok(issues)
    }

    /// Adds a virtual column, or overwrites an existing definition when
    /// `overwrite` is set. Fails fast on the first validation issue.
    pub fn add_column(&self, spec: &ColumnSpec) -> RegistryResult<AttributeDefinition> {
        let issues = self.check_column(spec)?;
        if let Some(first) = issues.into_iter().next() {
            return Err(first.into_error());
        }

        let attr_type = Self::map_type(&spec.attr_type)?;
        let existing = self.find_definition(&spec.name, spec.bundle.as_deref())?;

        let mut txn = self.backend().begin()?;
        let definition = match existing {
            Some(mut current) => {
                current.attr_type = attr_type;
                current.searchable = spec.searchable;
                current.extra = spec.extra.clone();

                let mut changes = Row::new();
                changes.insert("type".into(), json!(attr_type.type_name()));
                changes.insert("searchable".into(), json!(spec.searchable));
                changes.insert("extra".into(), spec.extra.clone().unwrap_or(Value::Null));
                txn.update(
                    EAV_ATTRIBUTES_TABLE,
                    &[Predicate::eq("id", json!(current.id))],
                    changes,
                )?;
                current
            }
            None => {
                let mut definition =
                    AttributeDefinition::new(self.table_alias(), &spec.name, attr_type)
                        .with_searchable(spec.searchable);
                if let Some(bundle) = &spec.bundle {
                    definition = definition.with_bundle(bundle);
                }
                if let Some(extra) = &spec.extra {
                    definition = definition.with_extra(extra.clone());
                }
                txn.insert(EAV_ATTRIBUTES_TABLE, definition.to_row())?;
                definition
            }
        };
        txn.commit()?;

        self.cache().invalidate(self.table_alias(), spec.bundle.as_deref());
        Logger::log(
            Severity::Info,
            "eav.column_added",
            &[
                ("table", self.table_alias()),
                ("column", &spec.name),
                ("type", attr_type.type_name()),
            ],
        );
        Ok(definition)
    }

    /// Drops a virtual column and all of its stored values.
    ///
    /// Returns false when no definition matches (name, bundle).
    pub fn drop_column(&self, name: &str, bundle: Option<&str>) -> RegistryResult<bool> {
        let definition = match self.find_definition(name, bundle)? {
            Some(def) => def,
            None => return Ok(false),
        };

        let mut txn = self.backend().begin()?;
        txn.delete(
            EAV_ATTRIBUTES_TABLE,
            &[Predicate::eq("id", json!(definition.id))],
        )?;
        txn.delete(
            EAV_VALUES_TABLE,
            &[Predicate::eq("attribute_id", json!(definition.id))],
        )?;
        txn.commit()?;

        self.cache().invalidate(self.table_alias(), bundle);
        Logger::log(
            Severity::Info,
            "eav.column_dropped",
            &[("table", self.table_alias()), ("column", name)],
        );
        Ok(true)
    }

    /// Finds the definition matching (name, bundle) exactly.
    ///
    /// Unlike `attributes`, a bundle-free definition does not stand in
    /// for a bundle-scoped one here: add/drop target one row.
    pub fn find_definition(
        &self,
        name: &str,
        bundle: Option<&str>,
    ) -> RegistryResult<Option<AttributeDefinition>> {
        let query = Query::new(EAV_ATTRIBUTES_TABLE)
            .filter(Predicate::eq("table_alias", json!(self.table_alias())))
            .filter(Predicate::eq("name", json!(name)));
        let rows = self.backend().select(&query)?;

        for row in &rows {
            let def = AttributeDefinition::from_row(row)?;
            if def.bundle.as_deref() == bundle {
                return Ok(Some(def));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, TableSchema};
    use crate::registry::MetadataCache;
    use std::sync::Arc;

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

    #[test]
    fn test_valid_column_names() {
        assert!(valid_column_name("user-age"));
        assert!(valid_column_name("email_virtual"));
        assert!(valid_column_name("a1"));
        assert!(!valid_column_name("User-Age"));
        assert!(!valid_column_name("1age"));
        assert!(!valid_column_name(""));
        assert!(!valid_column_name("user age"));
    }

    #[test]
    fn test_add_column_appears_in_listing_with_normalized_type() {
        let (_backend, toolbox) = setup();
        toolbox
            .add_column(&ColumnSpec::new("user-age", "int"))
            .unwrap();

        let attributes = toolbox.attributes(None).unwrap();
        let def = attributes.get("user-age").unwrap();
        assert_eq!(def.attr_type, AttributeType::Integer);
        assert!(def.searchable);
    }

    #[test]
    fn test_add_column_rejects_native_collision() {
        let (_backend, toolbox) = setup();
        let err = toolbox
            .add_column(&ColumnSpec::new("name", "string"))
            .unwrap_err();
        assert_eq!(err.code(), RegistryErrorCode::NativeCollision);
    }

    #[test]
    fn test_add_column_rejects_unknown_type() {
        let (_backend, toolbox) = setup();
        let err = toolbox
            .add_column(&ColumnSpec::new("payload", "json"))
            .unwrap_err();
        assert_eq!(err.code(), RegistryErrorCode::UnknownType);
    }

    #[test]
    fn test_add_column_rejects_bad_syntax() {
        let (_backend, toolbox) = setup();
        let err = toolbox
            .add_column(&ColumnSpec::new("Bad Name", "string"))
            .unwrap_err();
        assert_eq!(err.code(), RegistryErrorCode::InvalidName);
    }

    #[test]
    fn test_duplicate_without_overwrite_fails() {
        let (_backend, toolbox) = setup();
        toolbox
            .add_column(&ColumnSpec::new("user-age", "integer"))
            .unwrap();

        let err = toolbox
            .add_column(&ColumnSpec::new("user-age", "integer"))
            .unwrap_err();
        assert_eq!(err.code(), RegistryErrorCode::DuplicateDefinition);
    }

    #[test]
    fn test_duplicate_with_overwrite_updates_in_place() {
        let (_backend, toolbox) = setup();
        let first = toolbox
            .add_column(&ColumnSpec::new("user-age", "integer"))
            .unwrap();

        let second = toolbox
            .add_column(
                &ColumnSpec::new("user-age", "string")
                    .with_searchable(false)
                    .with_overwrite(true),
            )
            .unwrap();

        // Same row, new type and flags
        assert_eq!(first.id, second.id);
        let attributes = toolbox.attributes(None).unwrap();
        let def = attributes.get("user-age").unwrap();
        assert_eq!(def.attr_type, AttributeType::String);
        assert!(!def.searchable);
    }

    #[test]
    fn test_same_name_in_different_bundles_is_not_a_duplicate() {
        let (_backend, toolbox) = setup();
        toolbox
            .add_column(&ColumnSpec::new("badge", "string").with_bundle("employee"))
            .unwrap();
        toolbox
            .add_column(&ColumnSpec::new("badge", "string").with_bundle("customer"))
            .unwrap();

        assert_eq!(toolbox.attributes(Some("employee")).unwrap().len(), 1);
        assert_eq!(toolbox.attributes(Some("customer")).unwrap().len(), 1);
    }

    #[test]
    fn test_check_column_collects_every_issue() {
        let (_backend, toolbox) = setup();
        let issues = toolbox
            .check_column(&ColumnSpec::new("Bad Name", "json"))
            .unwrap();
        let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert!(codes.contains(&RegistryErrorCode::InvalidName));
        assert!(codes.contains(&RegistryErrorCode::UnknownType));
    }

    #[test]
    fn test_drop_column_removes_definition_and_values() {
        let (backend, toolbox) = setup();
        let def = toolbox
            .add_column(&ColumnSpec::new("user-age", "integer"))
            .unwrap();

        // Seed one value row for the attribute
        let value = crate::store::AttributeValue::new(def.id, "7");
        backend.insert_row(EAV_VALUES_TABLE, value.to_row()).unwrap();
        assert_eq!(backend.row_count(EAV_VALUES_TABLE).unwrap(), 1);

        assert!(toolbox.drop_column("user-age", None).unwrap());
        assert_eq!(backend.row_count(EAV_VALUES_TABLE).unwrap(), 0);
        assert!(toolbox.attributes(None).unwrap().is_empty());
    }

    #[test]
    fn test_drop_missing_column_returns_false() {
        let (_backend, toolbox) = setup();
        assert!(!toolbox.drop_column("ghost", None).unwrap());
    }

    #[test]
    fn test_add_invalidates_cache_synchronously() {
        let (_backend, toolbox) = setup();
        assert!(toolbox.attributes(None).unwrap().is_empty());

        toolbox
            .add_column(&ColumnSpec::new("user-age", "integer"))
            .unwrap();

        // No manual invalidation: the add already dropped the cached view
        assert_eq!(toolbox.attributes(None).unwrap().len(), 1);
    }
}
