//! Collision/merge resolution.
//!
//! Consumes the contacts produced by one physics step, in report order. Two live
//! bodies of the same tier fuse into one body of the next tier at their midpoint;
//! two bodies of the top tier simply vanish. A body takes part in at most one
//! merge per batch.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::Tier;
use crate::error::GameError;
use crate::game::GameState;
use crate::physics::{BodyId, CollisionEvent, PhysicsBackend, PhysicsWorld};

/// What a single merge did to the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Two bodies of `from_tier` became `created` of `to_tier`.
    Merged {
        consumed: [BodyId; 2],
        from_tier: Tier,
        to_tier: Tier,
        created: BodyId,
        position: [f32; 2],
    },
    /// Two top-tier bodies were removed without replacement.
    Cleared {
        consumed: [BodyId; 2],
        tier: Tier,
        position: [f32; 2],
    },
}

impl MergeOutcome {
    pub fn consumed(&self) -> [BodyId; 2] {
        match self {
            Self::Merged { consumed, .. } | Self::Cleared { consumed, .. } => *consumed,
        }
    }
}

/// Applies the merge rule to one step's collision batch.
///
/// Does nothing once the game is over.
pub fn resolve_collisions<B: PhysicsBackend>(
    world: &mut PhysicsWorld<B>,
    events: &[CollisionEvent],
    state: GameState,
) -> Result<Vec<MergeOutcome>, GameError> {
    if state == GameState::GameOver {
        return Ok(Vec::new());
    }

    let mut consumed = BTreeSet::new();
    let mut outcomes = Vec::new();

    for event in events {
        let CollisionEvent { a, b } = *event;
        if a == b || consumed.contains(&a) || consumed.contains(&b) {
            continue;
        }

        let (Some(body_a), Some(body_b)) = (world.body(a), world.body(b)) else {
            continue;
        };
        if body_a.tier != body_b.tier {
            continue;
        }
        let tier = body_a.tier;

        let (Some(state_a), Some(state_b)) = (world.body_state(a), world.body_state(b)) else {
            continue;
        };
        let position = [
            f32::midpoint(state_a.position[0], state_b.position[0]),
            f32::midpoint(state_a.position[1], state_b.position[1]),
        ];

        // Create the replacement first so a failed insert leaves both bodies live.
        let outcome = match world.catalog().next_tier(tier) {
            Some(next) => {
                let created = world.add_body(next, position)?;
                world.remove_body(a);
                world.remove_body(b);
                tracing::debug!(
                    "[merge] {} + {} (tier {}) -> {} (tier {})",
                    a,
                    b,
                    tier,
                    created,
                    next
                );
                MergeOutcome::Merged {
                    consumed: [a, b],
                    from_tier: tier,
                    to_tier: next,
                    created,
                    position,
                }
            }
            None => {
                world.remove_body(a);
                world.remove_body(b);
                tracing::debug!("[merge] {} + {} cleared at top tier {}", a, b, tier);
                MergeOutcome::Cleared {
                    consumed: [a, b],
                    tier,
                    position,
                }
            }
        };
        consumed.insert(a);
        consumed.insert(b);
        outcomes.push(outcome);
    }

    Ok(outcomes)
}
