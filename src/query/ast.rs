//! Query AST structures
//!
//! A `Query` starts out referencing columns by name, native and virtual
//! alike. The scope chain moves every virtual-column reference out of the
//! native clauses and into the value-store sub-condition lists
//! (`virtual_filters`, `virtual_order`), leaving the native clauses for
//! the backend to execute untouched.

use serde_json::Value;
use uuid::Uuid;

/// Filter operation types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Equality: field = value
    Eq(Value),
    /// Inequality: field != value
    Ne(Value),
    /// Greater than: field > value
    Gt(Value),
    /// Greater than or equal: field >= value
    Gte(Value),
    /// Less than: field < value
    Lt(Value),
    /// Less than or equal: field <= value
    Lte(Value),
    /// Membership: field IN (values)
    In(Vec<Value>),
}

impl FilterOp {
    /// Returns true if this is an equality operation
    pub fn is_equality(&self) -> bool {
        matches!(self, FilterOp::Eq(_))
    }

    /// Returns true if this is a range operation
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            FilterOp::Gt(_) | FilterOp::Gte(_) | FilterOp::Lt(_) | FilterOp::Lte(_)
        )
    }

    /// Returns the operation name for diagnostics
    pub fn op_name(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "eq",
            FilterOp::Ne(_) => "ne",
            FilterOp::Gt(_) => "gt",
            FilterOp::Gte(_) => "gte",
            FilterOp::Lt(_) => "lt",
            FilterOp::Lte(_) => "lte",
            FilterOp::In(_) => "in",
        }
    }

    /// Rebuilds the operation with every literal passed through `f`.
    ///
    /// Used by the where scope to marshal comparison literals to the
    /// attribute's canonical type while preserving the operator.
    pub fn try_map_values<E>(&self, mut f: impl FnMut(&Value) -> Result<Value, E>) -> Result<FilterOp, E> {
        Ok(match self {
            FilterOp::Eq(v) => FilterOp::Eq(f(v)?),
            FilterOp::Ne(v) => FilterOp::Ne(f(v)?),
            FilterOp::Gt(v) => FilterOp::Gt(f(v)?),
            FilterOp::Gte(v) => FilterOp::Gte(f(v)?),
            FilterOp::Lt(v) => FilterOp::Lt(f(v)?),
            FilterOp::Lte(v) => FilterOp::Lte(f(v)?),
            FilterOp::In(vs) => FilterOp::In(vs.iter().map(&mut f).collect::<Result<_, E>>()?),
        })
    }
}

/// Boolean combinator joining a predicate to the preceding ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

/// A single filter condition (field + operation + combinator)
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Field name, bare or qualified (`table.column`)
    pub field: String,
    /// Filter operation
    pub op: FilterOp,
    /// How this condition joins the preceding ones
    pub combinator: Combinator,
}

impl Predicate {
    /// Create a predicate with an explicit operation (AND-joined)
    pub fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
            combinator: Combinator::And,
        }
    }

    /// Create an equality predicate
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Eq(value))
    }

    /// Create an inequality predicate
    pub fn ne(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Ne(value))
    }

    /// Create a range predicate (gt)
    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Gt(value))
    }

    /// Create a range predicate (gte)
    pub fn gte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Gte(value))
    }

    /// Create a range predicate (lt)
    pub fn lt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Lt(value))
    }

    /// Create a range predicate (lte)
    pub fn lte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOp::Lte(value))
    }

    /// Create a membership predicate
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FilterOp::In(values))
    }

    /// Switches the combinator to OR
    pub fn or(mut self) -> Self {
        self.combinator = Combinator::Or;
        self
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    /// Field to sort by, bare or qualified
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl OrderSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// One requested column in the select clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    /// Column name, bare or qualified
    pub field: String,
    /// Output alias, if the caller requested one
    pub alias: Option<String>,
}

impl SelectItem {
    /// Select a column under its own name
    pub fn col(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            alias: None,
        }
    }

    /// Select a column under an alias
    pub fn aliased(field: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            alias: Some(alias.into()),
        }
    }

    /// Returns the name this column appears under in the result
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field)
    }
}

/// A filter condition rewritten against the value store.
///
/// Existence semantics: the entity matches when it has a value row for
/// `attribute_id` whose `slot` satisfies `op`.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualFilter {
    /// Attribute the condition targets
    pub attribute_id: Uuid,
    /// Slot column holding the attribute's values
    pub slot: &'static str,
    /// Comparison, literals already marshalled to the attribute's type
    pub op: FilterOp,
    /// How this condition joins the preceding ones
    pub combinator: Combinator,
}

/// An ordering clause rewritten against the value store
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualOrder {
    /// Attribute to sort by
    pub attribute_id: Uuid,
    /// Slot column holding the attribute's values
    pub slot: &'static str,
    /// Sort direction
    pub direction: SortDirection,
}

/// A query against one logical table
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Target table name
    pub table: String,
    /// Requested columns; empty means all native columns
    pub select: Vec<SelectItem>,
    /// Filter conditions over native columns
    pub predicates: Vec<Predicate>,
    /// Ordering over native columns
    pub order: Vec<OrderSpec>,
    /// Maximum number of rows to return
    pub limit: Option<u64>,
    /// Filter conditions rewritten against the value store
    pub virtual_filters: Vec<VirtualFilter>,
    /// Ordering rewritten against the value store
    pub virtual_order: Vec<VirtualOrder>,
}

impl Query {
    /// Creates a new query for `table` selecting all native columns
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: Vec::new(),
            predicates: Vec::new(),
            order: Vec::new(),
            limit: None,
            virtual_filters: Vec::new(),
            virtual_order: Vec::new(),
        }
    }

    /// Adds a select item
    pub fn select(mut self, item: SelectItem) -> Self {
        self.select.push(item);
        self
    }

    /// Adds a filter predicate
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Adds an ordering clause
    pub fn order_by(mut self, order: OrderSpec) -> Self {
        self.order.push(order);
        self
    }

    /// Sets the limit
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resolves a possibly-qualified field reference against this query's
    /// table: `users.age` becomes `age`; references qualified with a
    /// different table stay untouched.
    pub fn column_name<'a>(&self, field: &'a str) -> &'a str {
        match field.split_once('.') {
            Some((table, column)) if table == self.table => column,
            _ => field,
        }
    }
}
