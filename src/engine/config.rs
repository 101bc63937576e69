//! Engine configuration options.
//!
//! The account layouts observed across venue revisions differ only in how
//! they define health, so the difference is carried here as configuration
//! instead of separate engine types.

use crate::types::MarginCategory;

/// Engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Margin category the health score is computed under.
    pub health_basis: MarginCategory,
    /// Use conservative TWAP-aware pricing for health.
    pub strict_health: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            health_basis: MarginCategory::Initial,
            strict_health: true,
        }
    }
}

impl EngineConfig {
    /// Match the venue's own health definition, which keys off the
    /// maintenance tier rather than the stricter initial tier.
    pub fn venue_parity() -> Self {
        Self {
            health_basis: MarginCategory::Maintenance,
            ..Self::default()
        }
    }
}
