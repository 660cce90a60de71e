//! Persistence error types

use thiserror::Error;

use crate::backend::BackendError;
use crate::cachecol::CacheError;
use crate::marshal::MarshalError;
use crate::registry::RegistryError;
use crate::store::StoreError;

/// Result type for the persistence pipeline
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors raised while reconciling virtual values on save or delete.
///
/// Every variant aborts the enclosing transaction; no partial attribute
/// writes survive.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Metadata could not be loaded or entity identity resolved
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Value rows could not be read or written
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A record property could not be coerced to its column's type
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// Cache columns could not be refreshed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Backend failure, propagated unmodified
    #[error(transparent)]
    Backend(#[from] BackendError),
}
