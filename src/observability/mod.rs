//! Observability
//!
//! Structured JSON logging for the layer and the administrative CLI.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No async or background threads
//! 4. Deterministic output

mod logger;

pub use logger::{Logger, Severity};
