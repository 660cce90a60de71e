//! Hydration error types

use thiserror::Error;

use crate::registry::RegistryError;
use crate::store::StoreError;

/// Result type for hydration
pub type HydrateResult<T> = Result<T, HydrateError>;

/// Errors raised while attaching virtual values to fetched records
#[derive(Debug, Error)]
pub enum HydrateError {
    /// Metadata could not be loaded or entity identity resolved
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Value rows could not be loaded
    #[error(transparent)]
    Store(#[from] StoreError),
}
