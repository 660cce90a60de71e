//! Query representation
//!
//! Defines the query AST the layer rewrites and the backend executes.

mod ast;

pub use ast::{
    Combinator, FilterOp, OrderSpec, Predicate, Query, SelectItem, SortDirection, VirtualFilter,
    VirtualOrder,
};
