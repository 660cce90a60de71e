//! Cache-column error types

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Decode failures for cache-column payloads.
///
/// Every failure is detectable by format (armor, magic, version,
/// length, checksum, payload shape); readers substitute an empty cache
/// value instead of propagating these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Cell holds a non-string value
    #[error("Cache cell is not a string")]
    NotAString,

    /// Base64 armor could not be decoded
    #[error("Bad base64 armor: {0}")]
    BadArmor(String),

    /// Envelope shorter than the fixed header and trailer
    #[error("Envelope truncated: {0} bytes")]
    Truncated(usize),

    /// Envelope does not start with the cache magic
    #[error("Bad magic")]
    BadMagic,

    /// Envelope version not understood
    #[error("Unsupported version {0}")]
    UnsupportedVersion(u8),

    /// Declared payload length disagrees with the envelope size
    #[error("Length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch {
        /// Length recorded in the header
        declared: usize,
        /// Bytes actually present
        actual: usize,
    },

    /// CRC32 over the envelope body does not match the trailer
    #[error("Checksum mismatch: computed {computed:08x}, stored {stored:08x}")]
    ChecksumMismatch {
        /// Checksum computed from the envelope body
        computed: u32,
        /// Checksum stored in the trailer
        stored: u32,
    },

    /// Payload is not a JSON object
    #[error("Bad payload: {0}")]
    BadPayload(String),
}

/// Errors raised while rebuilding cache columns
#[derive(Debug, Error)]
pub enum CacheError {
    /// Metadata could not be loaded
    #[error(transparent)]
    Registry(#[from] crate::registry::RegistryError),

    /// Value rows could not be loaded
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    /// Backend failure, propagated unmodified
    #[error(transparent)]
    Backend(#[from] crate::backend::BackendError),

    /// The record is missing its primary-key properties
    #[error("Record of table '{0}' is missing primary-key properties")]
    MissingPrimaryKey(String),
}
