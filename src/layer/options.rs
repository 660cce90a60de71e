//! Per-call find options

/// Options controlling one find call
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Tri-state override: `Some(_)` beats the table's standing flag,
    /// `None` defers to it
    pub eav: Option<bool>,
    /// Bundle to scope virtual columns to
    pub bundle: Option<String>,
}

impl FindOptions {
    /// Defaults: defer to the standing flag, no bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces virtual columns on or off for this call
    pub fn with_eav(mut self, eav: bool) -> Self {
        self.eav = Some(eav);
        self
    }

    /// Scopes the call to a bundle
    pub fn with_bundle(mut self, bundle: impl Into<String>) -> Self {
        self.bundle = Some(bundle.into());
        self
    }

    /// Resolves the effective status for this call
    pub fn eav_active(&self, standing: bool) -> bool {
        self.eav.unwrap_or(standing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_beats_standing_flag() {
        assert!(FindOptions::new().with_eav(true).eav_active(false));
        assert!(!FindOptions::new().with_eav(false).eav_active(true));
    }

    #[test]
    fn test_default_defers_to_standing_flag() {
        assert!(FindOptions::new().eav_active(true));
        assert!(!FindOptions::new().eav_active(false));
    }
}
