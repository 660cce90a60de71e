//! Marshalling error types

use thiserror::Error;

/// Result type for marshalling operations
pub type MarshalResult<T> = Result<T, MarshalError>;

/// Errors raised while normalizing types or coercing values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// Type alias could not be mapped to a canonical type
    #[error("Unknown attribute type '{0}'")]
    UnknownType(String),

    /// Value could not be coerced to the attribute's canonical type
    #[error("Cannot coerce {actual} to {expected}")]
    Coerce {
        /// Canonical type name the value was expected to match
        expected: &'static str,
        /// Rendering of the offending value
        actual: String,
    },
}

impl MarshalError {
    /// Create a coercion error for a value/type mismatch
    pub fn coerce(expected: &'static str, actual: &serde_json::Value) -> Self {
        Self::Coerce {
            expected,
            actual: super::render_value(actual),
        }
    }
}
