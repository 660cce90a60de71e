//! Layer error types

use thiserror::Error;

use crate::backend::BackendError;
use crate::hydrate::HydrateError;
use crate::persist::PersistError;
use crate::registry::RegistryError;
use crate::scope::ScopeError;
use crate::store::StoreError;

/// Result type for layer operations
pub type EavResult<T> = Result<T, EavError>;

/// Unified error surface of the layer
#[derive(Debug, Error)]
pub enum EavError {
    /// Deletion of a record with virtual columns attempted outside an
    /// atomic context; rejected before any row is touched
    #[error("Non-atomic delete of a record with virtual columns on table '{0}'")]
    NonAtomicDelete(String),

    /// Registry failure (configuration or storage)
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Query rewrite failure
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// Read-path failure
    #[error(transparent)]
    Hydrate(#[from] HydrateError),

    /// Write-path failure
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// Value-store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Backend failure, propagated unmodified
    #[error(transparent)]
    Backend(#[from] BackendError),
}
