//! Hydration
//!
//! The read-path pipeline that surfaces virtual columns on fetched
//! records, plus the pluggable hydrator strategy it applies.

mod errors;
mod hydrator;
mod pipeline;

pub use errors::{HydrateError, HydrateResult};
pub use hydrator::{DefaultHydrator, Hydrator};
pub use pipeline::HydrationPipeline;
