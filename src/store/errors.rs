//! Value-store error types

use thiserror::Error;

use crate::backend::BackendError;
use crate::marshal::MarshalError;

/// Result type for value-store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by value-store access
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure, propagated unmodified
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Value could not be coerced to the attribute's type
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// A stored value row could not be decoded
    #[error("Malformed attribute value row: {0}")]
    MalformedRow(String),
}
