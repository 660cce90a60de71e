//! Attach-time configuration
//!
//! Read once when the layer is attached to a table: the standing
//! enabled flag, the cache-holder specification, the hydrator strategy
//! and the ordered scope chain. Strategies are resolved here, at
//! configuration time, never by name at run time.

use std::sync::Arc;

use crate::cachecol::CacheSpec;
use crate::hydrate::{DefaultHydrator, Hydrator};
use crate::scope::ScopeChain;

/// Configuration of one attached table
pub struct EavConfig {
    /// Standing enabled flag; a per-call override beats it
    pub enabled: bool,
    /// Configured cache holders
    pub cache: CacheSpec,
    /// Hydrator applied to each fetched record
    pub hydrator: Arc<dyn Hydrator>,
    /// Query scopes, applied in order
    pub scopes: ScopeChain,
}

impl EavConfig {
    /// Defaults: enabled, no cache holders, default hydrator, standard
    /// scope chain
    pub fn new() -> Self {
        Self {
            enabled: true,
            cache: CacheSpec::none(),
            hydrator: Arc::new(DefaultHydrator),
            scopes: ScopeChain::standard(),
        }
    }

    /// Sets the standing enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Configures cache holders
    pub fn with_cache(mut self, cache: CacheSpec) -> Self {
        self.cache = cache;
        self
    }

    /// Replaces the hydrator strategy
    pub fn with_hydrator(mut self, hydrator: Arc<dyn Hydrator>) -> Self {
        self.hydrator = hydrator;
        self
    }

    /// Replaces the scope chain
    pub fn with_scopes(mut self, scopes: ScopeChain) -> Self {
        self.scopes = scopes;
        self
    }
}

impl Default for EavConfig {
    fn default() -> Self {
        Self::new()
    }
}
