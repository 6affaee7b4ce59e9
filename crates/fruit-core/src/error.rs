//! Runtime error type for world mutation.

use crate::catalog::Tier;
use crate::physics::BodyId;

/// Error type for physics world operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    /// A tier index outside the catalog. Unreachable when tiers come from the
    /// spawn controller or the merge rule.
    #[error("Tier {tier} is outside the catalog (0..{tier_count})")]
    InvalidTier { tier: Tier, tier_count: usize },

    /// The body was already removed, usually by an earlier merge in the same tick.
    #[error("Body {0} no longer exists")]
    StaleBodyReference(BodyId),

    /// A body position with a NaN or infinite coordinate.
    #[error("Position {0:?} is not finite")]
    NonFinitePosition([f32; 2]),
}
