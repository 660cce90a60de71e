//! Query Scope Tests
//!
//! Tests for query rewriting end to end:
//! - filters on virtual columns select the right entities
//! - ordering by a virtual column sorts by stored values
//! - select aliasing surfaces virtual columns under requested names
//! - non-searchable columns are rejected before any query executes

use std::sync::Arc;

use serde_json::json;
use sidecol::backend::{MemoryBackend, TableSchema};
use sidecol::layer::{EavConfig, EavError, EavLayer, FindOptions};
use sidecol::query::{OrderSpec, Predicate, Query, SelectItem};
use sidecol::record::Record;
use sidecol::registry::ColumnSpec;
use sidecol::scope::ScopeError;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_layer() -> (Arc<MemoryBackend>, EavLayer) {
    let backend = Arc::new(MemoryBackend::new());
    backend.create_table(TableSchema::new(
        "users",
        vec!["id".into(), "name".into()],
        vec!["id".into()],
    ));
    let layer = EavLayer::attach(backend.clone(), "users", EavConfig::new());
    (backend, layer)
}

/// Three users with ages 25, 30, 35
fn seed_users_with_ages(layer: &EavLayer) {
    layer.add_column(&ColumnSpec::new("user-age", "integer")).unwrap();
    for (id, name, age) in [(1, "Alice", 30), (2, "Bob", 25), (3, "Carol", 35)] {
        let mut record = Record::new("users");
        record.set("id", json!(id));
        record.set("name", json!(name));
        record.set("user-age", json!(age));
        layer.save(&mut record).unwrap();
    }
}

fn names(records: &[Record]) -> Vec<&str> {
    records
        .iter()
        .map(|r| r.get("name").and_then(|v| v.as_str()).unwrap_or(""))
        .collect()
}

// =============================================================================
// Where Rewriting
// =============================================================================

/// Equality and range filters on virtual columns match stored values.
#[test]
fn test_filter_by_virtual_column() {
    let (_backend, layer) = setup_layer();
    seed_users_with_ages(&layer);

    let records = layer
        .find(
            Query::new("users").filter(Predicate::gte("user-age", json!(30))),
            &FindOptions::new(),
        )
        .unwrap();
    let mut found = names(&records);
    found.sort_unstable();
    assert_eq!(found, vec!["Alice", "Carol"]);
}

/// Comparison literals are marshalled: a string "30" matches integer 30.
#[test]
fn test_filter_literal_is_marshalled() {
    let (_backend, layer) = setup_layer();
    seed_users_with_ages(&layer);

    let records = layer
        .find(
            Query::new("users").filter(Predicate::eq("user-age", json!("30"))),
            &FindOptions::new(),
        )
        .unwrap();
    assert_eq!(names(&records), vec!["Alice"]);
}

/// IN filters and OR combinators survive the rewrite.
#[test]
fn test_in_filter_and_or_combinator() {
    let (_backend, layer) = setup_layer();
    seed_users_with_ages(&layer);

    let records = layer
        .find(
            Query::new("users")
                .filter(Predicate::is_in("user-age", vec![json!(25), json!(35)])),
            &FindOptions::new(),
        )
        .unwrap();
    assert_eq!(records.len(), 2);

    let records = layer
        .find(
            Query::new("users")
                .filter(Predicate::eq("name", json!("Bob")))
                .filter(Predicate::eq("user-age", json!(35)).or()),
            &FindOptions::new(),
        )
        .unwrap();
    let mut found = names(&records);
    found.sort_unstable();
    assert_eq!(found, vec!["Bob", "Carol"]);
}

/// Mixed native and virtual filters compose.
#[test]
fn test_native_and_virtual_filters_compose() {
    let (_backend, layer) = setup_layer();
    seed_users_with_ages(&layer);

    let records = layer
        .find(
            Query::new("users")
                .filter(Predicate::eq("name", json!("Alice")))
                .filter(Predicate::lt("user-age", json!(40))),
            &FindOptions::new(),
        )
        .unwrap();
    assert_eq!(names(&records), vec!["Alice"]);
}

// =============================================================================
// Order Rewriting
// =============================================================================

/// Ordering by a virtual column sorts by stored values.
#[test]
fn test_order_by_virtual_column() {
    let (_backend, layer) = setup_layer();
    seed_users_with_ages(&layer);

    let records = layer
        .find(
            Query::new("users").order_by(OrderSpec::desc("user-age")),
            &FindOptions::new(),
        )
        .unwrap();
    assert_eq!(names(&records), vec!["Carol", "Alice", "Bob"]);
}

/// Limit applies after virtual ordering.
#[test]
fn test_order_with_limit() {
    let (_backend, layer) = setup_layer();
    seed_users_with_ages(&layer);

    let records = layer
        .find(
            Query::new("users")
                .order_by(OrderSpec::asc("user-age"))
                .with_limit(2),
            &FindOptions::new(),
        )
        .unwrap();
    assert_eq!(names(&records), vec!["Bob", "Alice"]);
}

// =============================================================================
// Select Rewriting
// =============================================================================

/// Virtual columns can be selected under an alias.
#[test]
fn test_select_with_alias() {
    let (_backend, layer) = setup_layer();
    seed_users_with_ages(&layer);

    let records = layer
        .find(
            Query::new("users")
                .select(SelectItem::col("name"))
                .select(SelectItem::aliased("user-age", "age"))
                .filter(Predicate::eq("id", json!(1))),
            &FindOptions::new(),
        )
        .unwrap();

    let record = &records[0];
    assert_eq!(record.get("age"), Some(&json!(30)));
    assert!(!record.has("user-age"));
    assert_eq!(record.get("name"), Some(&json!("Alice")));
}

// =============================================================================
// Searchable Enforcement
// =============================================================================

/// A filter on a non-searchable column is rejected before the table is
/// ever queried.
#[test]
fn test_unsearchable_filter_rejected_before_execution() {
    let (backend, layer) = setup_layer();
    layer
        .add_column(&ColumnSpec::new("internal-note", "string").with_searchable(false))
        .unwrap();

    let log_before = backend.select_log().len();
    let err = layer
        .find(
            Query::new("users").filter(Predicate::eq("internal-note", json!("x"))),
            &FindOptions::new(),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        EavError::Scope(ScopeError::NotSearchable { .. })
    ));
    // Metadata was loaded, but the users table was never touched
    let touched: Vec<String> = backend.select_log()[log_before..].to_vec();
    assert!(!touched.iter().any(|t| t == "users"));
}

/// Ordering by a non-searchable column is rejected the same way.
#[test]
fn test_unsearchable_order_rejected() {
    let (_backend, layer) = setup_layer();
    layer
        .add_column(&ColumnSpec::new("internal-note", "string").with_searchable(false))
        .unwrap();

    let err = layer
        .find(
            Query::new("users").order_by(OrderSpec::asc("internal-note")),
            &FindOptions::new(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EavError::Scope(ScopeError::NotSearchable { .. })
    ));
}
