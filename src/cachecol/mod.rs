//! Cache columns
//!
//! Denormalized snapshots of virtual values stored in real columns:
//! the holder configuration, the versioned envelope codec, and the
//! transactional rebuilder.

mod codec;
mod errors;
mod rebuild;
mod spec;

pub use codec::{decode, decode_or_empty, encode, CachedColumn};
pub use errors::{CacheError, CodecError, CodecResult};
pub use rebuild::CacheRebuilder;
pub use spec::{CacheSpec, ColumnSet};
