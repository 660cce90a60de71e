//! Attribute registry
//!
//! Owns virtual-column metadata: the definition rows, the process-wide
//! metadata cache, the table-bound toolbox the pipelines work through,
//! and the add/drop column administration.

mod admin;
mod cache;
mod definition;
mod errors;
mod toolbox;

pub use admin::{valid_column_name, ColumnSpec};
pub use cache::{DefinitionSet, MetadataCache};
pub use definition::{attributes_table_schema, AttributeDefinition, EAV_ATTRIBUTES_TABLE};
pub use errors::{RegistryError, RegistryErrorCode, RegistryResult, ValidationIssue};
pub use toolbox::Toolbox;
