//! In-memory backend
//!
//! Keeps every table as a vector of JSON rows behind one mutex.
//! Transactions work on a whole-database copy: commit swaps the copy in
//! under the lock, dropping without commit is a rollback. Value-store
//! sub-conditions are evaluated directly against the `eav_values` table.
//!
//! Optionally snapshots the whole database to a JSON file, which is what
//! the administrative CLI operates on.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::{Combinator, FilterOp, Predicate, Query, SortDirection, VirtualFilter, VirtualOrder};
use crate::registry::attributes_table_schema;
use crate::store::{values_table_schema, EAV_VALUES_TABLE};

use super::errors::{BackendError, BackendResult};
use super::{composite_entity_id, Backend, Row, RowLock, TableSchema, Transaction};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Database {
    tables: BTreeMap<String, Table>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Table {
    schema: TableSchema,
    rows: Vec<Row>,
}

/// Serialized form of the whole database
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    tables: Vec<Table>,
}

/// In-memory backend with optional file snapshots
pub struct MemoryBackend {
    db: Mutex<Database>,
    /// Tables touched by selects, in call order (used by tests to assert
    /// batching behavior)
    select_log: Mutex<Vec<String>>,
}

impl MemoryBackend {
    /// Creates an empty backend with the two EAV tables pre-created
    pub fn new() -> Self {
        let mut db = Database::default();
        for schema in [attributes_table_schema(), values_table_schema()] {
            db.tables.insert(
                schema.name.clone(),
                Table {
                    schema,
                    rows: Vec::new(),
                },
            );
        }
        Self {
            db: Mutex::new(db),
            select_log: Mutex::new(Vec::new()),
        }
    }

    /// Opens a backend from a snapshot file.
    ///
    /// A missing file yields a fresh backend; the EAV tables are created
    /// if the snapshot predates them.
    pub fn open(path: &Path) -> BackendResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .map_err(|e| BackendError::MalformedSnapshot(e.to_string()))?;

        let backend = Self::new();
        {
            let mut db = backend.lock_db();
            for table in snapshot.tables {
                db.tables.insert(table.schema.name.clone(), table);
            }
            for schema in [attributes_table_schema(), values_table_schema()] {
                db.tables.entry(schema.name.clone()).or_insert(Table {
                    schema,
                    rows: Vec::new(),
                });
            }
        }
        Ok(backend)
    }

    /// Writes the current state to a snapshot file
    pub fn save_to(&self, path: &Path) -> BackendResult<()> {
        let snapshot = {
            let db = self.lock_db();
            Snapshot {
                tables: db.tables.values().cloned().collect(),
            }
        };
        let raw = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| BackendError::MalformedSnapshot(e.to_string()))?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Creates a native table
    pub fn create_table(&self, schema: TableSchema) {
        let mut db = self.lock_db();
        db.tables.insert(
            schema.name.clone(),
            Table {
                schema,
                rows: Vec::new(),
            },
        );
    }

    /// Returns true if the table exists
    pub fn has_table(&self, table: &str) -> bool {
        self.lock_db().tables.contains_key(table)
    }

    /// Inserts a row outside any transaction (test and bootstrap helper)
    pub fn insert_row(&self, table: &str, row: Row) -> BackendResult<()> {
        let mut db = self.lock_db();
        insert_into(&mut db, table, row)
    }

    /// Returns the number of rows in a table
    pub fn row_count(&self, table: &str) -> BackendResult<usize> {
        let db = self.lock_db();
        db.tables
            .get(table)
            .map(|t| t.rows.len())
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))
    }

    /// Returns the tables touched by selects so far, in call order
    pub fn select_log(&self) -> Vec<String> {
        self.select_log.lock().expect("select log poisoned").clone()
    }

    fn lock_db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().expect("backend mutex poisoned")
    }

    fn log_select(&self, table: &str) {
        self.select_log
            .lock()
            .expect("select log poisoned")
            .push(table.to_string());
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn table_schema(&self, table: &str) -> BackendResult<TableSchema> {
        let db = self.lock_db();
        db.tables
            .get(table)
            .map(|t| t.schema.clone())
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))
    }

    fn select(&self, query: &Query) -> BackendResult<Vec<Row>> {
        self.log_select(&query.table);
        let db = self.lock_db();
        eval_query(&db, query)
    }

    fn begin(&self) -> BackendResult<Box<dyn Transaction + '_>> {
        let working = self.lock_db().clone();
        Ok(Box::new(MemoryTransaction {
            working,
            backend: self,
        }))
    }

    fn supports_row_locking(&self) -> bool {
        // Transactions are whole-database copy-on-commit, so ForUpdate
        // requests are accepted and ignored; concurrent writers degrade
        // to last-commit-wins.
        false
    }
}

/// Transaction over a working copy of the database.
///
/// Mutations apply to the copy; commit swaps it in under the lock, and
/// dropping the transaction without commit discards everything.
struct MemoryTransaction<'a> {
    working: Database,
    backend: &'a MemoryBackend,
}

impl Transaction for MemoryTransaction<'_> {
    fn select(&mut self, query: &Query, _lock: RowLock) -> BackendResult<Vec<Row>> {
        self.backend.log_select(&query.table);
        eval_query(&self.working, query)
    }

    fn insert(&mut self, table: &str, row: Row) -> BackendResult<()> {
        insert_into(&mut self.working, table, row)
    }

    fn update(&mut self, table: &str, filter: &[Predicate], changes: Row) -> BackendResult<usize> {
        let entry = self
            .working
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;
        for column in changes.keys() {
            if !entry.schema.has_column(column) {
                return Err(BackendError::UnknownColumn {
                    table: table.to_string(),
                    column: column.clone(),
                });
            }
        }

        let mut touched = 0;
        for row in entry.rows.iter_mut() {
            if matches_predicates(row, filter) {
                for (column, value) in &changes {
                    row.insert(column.clone(), value.clone());
                }
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn delete(&mut self, table: &str, filter: &[Predicate]) -> BackendResult<usize> {
        let entry = self
            .working
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;
        let before = entry.rows.len();
        entry.rows.retain(|row| !matches_predicates(row, filter));
        Ok(before - entry.rows.len())
    }

    fn commit(mut self: Box<Self>) -> BackendResult<()> {
        let working = std::mem::take(&mut self.working);
        *self.backend.lock_db() = working;
        Ok(())
    }
}

fn insert_into(db: &mut Database, table: &str, row: Row) -> BackendResult<()> {
    let entry = db
        .tables
        .get_mut(table)
        .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;
    for column in row.keys() {
        if !entry.schema.has_column(column) {
            return Err(BackendError::UnknownColumn {
                table: table.to_string(),
                column: column.clone(),
            });
        }
    }
    entry.rows.push(row);
    Ok(())
}

// ---------------------------------------------------------------------
// Query evaluation
// ---------------------------------------------------------------------

fn eval_query(db: &Database, query: &Query) -> BackendResult<Vec<Row>> {
    let table = db
        .tables
        .get(&query.table)
        .ok_or_else(|| BackendError::UnknownTable(query.table.clone()))?;

    let mut rows: Vec<Row> = table
        .rows
        .iter()
        .filter(|row| matches_query(db, &table.schema, query, row))
        .cloned()
        .collect();

    sort_rows(db, &table.schema, query, &mut rows);

    if let Some(limit) = query.limit {
        rows.truncate(limit as usize);
    }

    if query.select.is_empty() {
        return Ok(rows);
    }
    rows.into_iter()
        .map(|row| project_row(&table.schema, query, row))
        .collect()
}

/// Projects a row to the requested columns. Primary-key columns are
/// always carried so downstream stages can derive entity ids.
fn project_row(schema: &TableSchema, query: &Query, row: Row) -> BackendResult<Row> {
    let mut projected = Row::new();
    for key in &schema.primary_key {
        if let Some(value) = row.get(key) {
            projected.insert(key.clone(), value.clone());
        }
    }
    for item in &query.select {
        let column = query.column_name(&item.field);
        if !schema.has_column(column) {
            return Err(BackendError::UnknownColumn {
                table: schema.name.clone(),
                column: column.to_string(),
            });
        }
        let value = row.get(column).cloned().unwrap_or(Value::Null);
        projected.insert(item.output_name().to_string(), value);
    }
    Ok(projected)
}

/// Evaluates native predicates and value-store sub-conditions as one
/// left-to-right combinator fold
fn matches_query(db: &Database, schema: &TableSchema, query: &Query, row: &Row) -> bool {
    let mut acc: Option<bool> = None;

    for predicate in &query.predicates {
        let field = query.column_name(&predicate.field);
        let matched = match row.get(field) {
            Some(value) if !value.is_null() => matches_op(value, &predicate.op),
            // Missing field or null value never matches
            _ => false,
        };
        acc = Some(fold(acc, predicate.combinator, matched));
    }

    for vf in &query.virtual_filters {
        let matched = matches_virtual(db, schema, row, vf);
        acc = Some(fold(acc, vf.combinator, matched));
    }

    acc.unwrap_or(true)
}

fn fold(acc: Option<bool>, combinator: Combinator, matched: bool) -> bool {
    match (acc, combinator) {
        (None, _) => matched,
        (Some(prev), Combinator::And) => prev && matched,
        (Some(prev), Combinator::Or) => prev || matched,
    }
}

/// Existence check against the value store: the entity matches when it
/// has a value row for the attribute whose slot satisfies the operation
fn matches_virtual(db: &Database, schema: &TableSchema, row: &Row, vf: &VirtualFilter) -> bool {
    let entity_id = match composite_entity_id(&schema.primary_key, row) {
        Some(id) => id,
        None => return false,
    };
    let values = match db.tables.get(EAV_VALUES_TABLE) {
        Some(t) => t,
        None => return false,
    };
    let attribute_id = vf.attribute_id.to_string();

    values.rows.iter().any(|vrow| {
        vrow.get("attribute_id").and_then(Value::as_str) == Some(attribute_id.as_str())
            && vrow.get("entity_id").and_then(Value::as_str) == Some(entity_id.as_str())
            && vrow
                .get(vf.slot)
                .map_or(false, |slot| !slot.is_null() && matches_op(slot, &vf.op))
    })
}

fn matches_predicates(row: &Row, predicates: &[Predicate]) -> bool {
    let mut acc: Option<bool> = None;
    for predicate in predicates {
        let matched = match row.get(&predicate.field) {
            Some(value) if !value.is_null() => matches_op(value, &predicate.op),
            _ => false,
        };
        acc = Some(fold(acc, predicate.combinator, matched));
    }
    acc.unwrap_or(true)
}

fn matches_op(actual: &Value, op: &FilterOp) -> bool {
    match op {
        FilterOp::Eq(expected) => eq_values(actual, expected),
        FilterOp::Ne(expected) => !eq_values(actual, expected),
        FilterOp::Gt(bound) => cmp_values(actual, bound) == Some(std::cmp::Ordering::Greater),
        FilterOp::Gte(bound) => matches!(
            cmp_values(actual, bound),
            Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
        ),
        FilterOp::Lt(bound) => cmp_values(actual, bound) == Some(std::cmp::Ordering::Less),
        FilterOp::Lte(bound) => matches!(
            cmp_values(actual, bound),
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
        ),
        FilterOp::In(values) => values.iter().any(|v| eq_values(actual, v)),
    }
}

/// Equality: numbers compare numerically, everything else strictly.
/// No cross-type coercion (a string never equals a number).
fn eq_values(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(an), Value::Number(bn)) => match (an.as_f64(), bn.as_f64()) {
            (Some(af), Some(bf)) => af == bf,
            _ => an == bn,
        },
        _ => a == b,
    }
}

/// Ordering for same-type scalars; `None` for incomparable pairs
fn cmp_values(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(an), Value::Number(bn)) => {
            let af = an.as_f64()?;
            let bf = bn.as_f64()?;
            af.partial_cmp(&bf)
        }
        (Value::String(a_s), Value::String(b_s)) => Some(a_s.cmp(b_s)),
        (Value::Bool(a_b), Value::Bool(b_b)) => Some(a_b.cmp(b_b)),
        _ => None,
    }
}

// ---------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------

fn sort_rows(db: &Database, schema: &TableSchema, query: &Query, rows: &mut [Row]) {
    if query.order.is_empty() && query.virtual_order.is_empty() {
        return;
    }

    rows.sort_by(|a, b| {
        for spec in &query.order {
            let field = query.column_name(&spec.field);
            let ordering = compare_for_sort(a.get(field), b.get(field));
            let ordering = match spec.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        for vorder in &query.virtual_order {
            let a_val = virtual_sort_key(db, schema, a, vorder);
            let b_val = virtual_sort_key(db, schema, b, vorder);
            let ordering = compare_for_sort(a_val.as_ref(), b_val.as_ref());
            let ordering = match vorder.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}

/// Looks up the slot value backing a value-store sort key for one row
fn virtual_sort_key(
    db: &Database,
    schema: &TableSchema,
    row: &Row,
    vorder: &VirtualOrder,
) -> Option<Value> {
    let entity_id = composite_entity_id(&schema.primary_key, row)?;
    let values = db.tables.get(EAV_VALUES_TABLE)?;
    let attribute_id = vorder.attribute_id.to_string();

    values
        .rows
        .iter()
        .find(|vrow| {
            vrow.get("attribute_id").and_then(Value::as_str) == Some(attribute_id.as_str())
                && vrow.get("entity_id").and_then(Value::as_str) == Some(entity_id.as_str())
        })
        .and_then(|vrow| vrow.get(vorder.slot))
        .cloned()
}

/// Compares two optional values for sorting.
///
/// Ordering rules:
/// - absent < null < bool < number < string
/// - For same types, natural ordering
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => {
            let type_order = |v: &Value| -> u8 {
                match v {
                    Value::Null => 0,
                    Value::Bool(_) => 1,
                    Value::Number(_) => 2,
                    Value::String(_) => 3,
                    Value::Array(_) => 4,
                    Value::Object(_) => 5,
                }
            };

            let a_type = type_order(a_val);
            let b_type = type_order(b_val);
            if a_type != b_type {
                return a_type.cmp(&b_type);
            }

            match (a_val, b_val) {
                (Value::Bool(a_b), Value::Bool(b_b)) => a_b.cmp(b_b),
                (Value::Number(a_n), Value::Number(b_n)) => {
                    let a_f = a_n.as_f64().unwrap_or(0.0);
                    let b_f = b_n.as_f64().unwrap_or(0.0);
                    a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
                }
                (Value::String(a_s), Value::String(b_s)) => a_s.cmp(b_s),
                _ => Ordering::Equal,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{OrderSpec, SelectItem};
    use crate::registry::EAV_ATTRIBUTES_TABLE;
    use serde_json::json;

    fn users_schema() -> TableSchema {
        TableSchema::new(
            "users",
            vec!["id".into(), "name".into(), "age".into()],
            vec!["id".into()],
        )
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn seeded_backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.create_table(users_schema());
        backend
            .insert_row("users", row(&[("id", json!(1)), ("name", json!("Alice")), ("age", json!(30))]))
            .unwrap();
        backend
            .insert_row("users", row(&[("id", json!(2)), ("name", json!("Bob")), ("age", json!(25))]))
            .unwrap();
        backend
            .insert_row("users", row(&[("id", json!(3)), ("name", json!("Carol")), ("age", json!(35))]))
            .unwrap();
        backend
    }

    #[test]
    fn test_select_all_rows() {
        let backend = seeded_backend();
        let rows = backend.select(&Query::new("users")).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_select_with_predicate() {
        let backend = seeded_backend();
        let query = Query::new("users").filter(Predicate::gte("age", json!(30)));
        let rows = backend.select(&query).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_or_combinator() {
        let backend = seeded_backend();
        let query = Query::new("users")
            .filter(Predicate::eq("name", json!("Bob")))
            .filter(Predicate::eq("name", json!("Carol")).or());
        let rows = backend.select(&query).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_no_cross_type_coercion_in_filters() {
        let backend = seeded_backend();
        let query = Query::new("users").filter(Predicate::eq("age", json!("30")));
        let rows = backend.select(&query).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_sort_and_limit() {
        let backend = seeded_backend();
        let query = Query::new("users").order_by(OrderSpec::desc("age")).with_limit(2);
        let rows = backend.select(&query).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&json!("Carol")));
        assert_eq!(rows[1].get("name"), Some(&json!("Alice")));
    }

    #[test]
    fn test_projection_keeps_primary_key() {
        let backend = seeded_backend();
        let query = Query::new("users").select(SelectItem::aliased("name", "who"));
        let rows = backend.select(&query).unwrap();
        assert_eq!(rows[0].get("who"), Some(&json!("Alice")));
        assert!(rows[0].contains_key("id"));
        assert!(!rows[0].contains_key("age"));
    }

    #[test]
    fn test_projection_rejects_unknown_column() {
        let backend = seeded_backend();
        let query = Query::new("users").select(SelectItem::col("ghost"));
        assert!(matches!(
            backend.select(&query),
            Err(BackendError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_insert_rejects_unknown_column() {
        let backend = seeded_backend();
        let result = backend.insert_row("users", row(&[("id", json!(9)), ("ghost", json!(1))]));
        assert!(matches!(result, Err(BackendError::UnknownColumn { .. })));
    }

    #[test]
    fn test_transaction_commit_is_visible() {
        let backend = seeded_backend();
        let mut txn = backend.begin().unwrap();
        txn.insert("users", row(&[("id", json!(4)), ("name", json!("Dave")), ("age", json!(40))]))
            .unwrap();
        txn.commit().unwrap();
        assert_eq!(backend.row_count("users").unwrap(), 4);
    }

    #[test]
    fn test_transaction_drop_rolls_back() {
        let backend = seeded_backend();
        {
            let mut txn = backend.begin().unwrap();
            txn.insert("users", row(&[("id", json!(4)), ("name", json!("Dave")), ("age", json!(40))]))
                .unwrap();
            txn.delete("users", &[Predicate::eq("id", json!(1))]).unwrap();
            // Dropped without commit
        }
        assert_eq!(backend.row_count("users").unwrap(), 3);
    }

    #[test]
    fn test_update_returns_touched_count() {
        let backend = seeded_backend();
        let mut txn = backend.begin().unwrap();
        let touched = txn
            .update(
                "users",
                &[Predicate::gte("age", json!(30))],
                row(&[("age", json!(18))]),
            )
            .unwrap();
        assert_eq!(touched, 2);
        txn.commit().unwrap();

        let rows = backend
            .select(&Query::new("users").filter(Predicate::eq("age", json!(18))))
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let backend = seeded_backend();
        backend.save_to(&path).unwrap();

        let reopened = MemoryBackend::open(&path).unwrap();
        assert_eq!(reopened.row_count("users").unwrap(), 3);
        assert!(reopened.has_table(EAV_ATTRIBUTES_TABLE));
        assert!(reopened.has_table(EAV_VALUES_TABLE));
    }

    #[test]
    fn test_open_missing_file_yields_fresh_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = MemoryBackend::open(&dir.path().join("absent.json")).unwrap();
        assert!(backend.has_table(EAV_VALUES_TABLE));
    }

    #[test]
    fn test_select_log_records_tables() {
        let backend = seeded_backend();
        backend.select(&Query::new("users")).unwrap();
        backend.select(&Query::new("users")).unwrap();
        assert_eq!(backend.select_log(), vec!["users", "users"]);
    }
}
