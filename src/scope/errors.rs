//! Scope error types

use thiserror::Error;

use crate::marshal::MarshalError;
use crate::registry::RegistryError;

/// Result type for scope application
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors raised while rewriting a query
#[derive(Debug, Error)]
pub enum ScopeError {
    /// A filter or order clause references a column not marked searchable
    #[error("Virtual column '{column}' is not searchable")]
    NotSearchable {
        /// The offending column
        column: String,
    },

    /// Metadata could not be loaded
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A comparison literal could not be coerced to the column's type
    #[error(transparent)]
    Marshal(#[from] MarshalError),
}
