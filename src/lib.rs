//! sidecol - a virtual-column (EAV) extension layer for relational tables
//!
//! Attaches arbitrary "virtual columns" to a logical table without
//! altering its physical schema: definitions live in `eav_attributes`,
//! values in `eav_values`, and the layer surfaces them transparently
//! during reads, writes and queries.

pub mod backend;
pub mod cachecol;
pub mod cli;
pub mod hydrate;
pub mod layer;
pub mod marshal;
pub mod observability;
pub mod persist;
pub mod query;
pub mod record;
pub mod registry;
pub mod scope;
pub mod store;
