//! Spawn controller: arms the next fruit, aims it and releases it into the world.
//!
//! The armed fruit is a plain value, never a physics body, so nothing can touch
//! it before release.

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{FruitCatalog, Tier};
use crate::config::{ConfigError, GameConfig, SpawnPolicy};
use crate::error::GameError;
use crate::game::GameState;
use crate::physics::{BodyId, PhysicsBackend, PhysicsWorld};

/// The fruit currently being aimed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingFruit {
    pub tier: Tier,
    /// Horizontal center, kept within `radius..=width - radius`.
    pub x: f32,
}

/// Why a release request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotPlaying,
    CoolingDown,
    NoPendingFruit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released(BodyId),
    Ignored(IgnoreReason),
}

/// Draws next tiers from the configured policy.
#[derive(Debug, Clone)]
enum TierSampler {
    Uniform(usize),
    Weighted(WeightedIndex<u32>),
}

impl TierSampler {
    fn from_policy(policy: &SpawnPolicy) -> Result<Self, ConfigError> {
        match policy {
            SpawnPolicy::Uniform { count } => Ok(Self::Uniform(*count)),
            SpawnPolicy::Weighted { weights } => WeightedIndex::new(weights.iter().copied())
                .map(Self::Weighted)
                .map_err(|e| ConfigError::InvalidSpawnPolicy(e.to_string())),
        }
    }

    fn sample(&self, rng: &mut ChaCha8Rng) -> Tier {
        match self {
            Self::Uniform(count) => rng.random_range(0..*count),
            Self::Weighted(dist) => dist.sample(rng),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpawnController {
    pending: Option<PendingFruit>,
    sampler: TierSampler,
    rng: ChaCha8Rng,
    spawn_y: f32,
    width: f32,
    cooldown_ticks: u64,
    /// World tick at which the cooldown from the last release ends.
    cooldown_until: Option<u64>,
    /// Last requested aim, reapplied to each newly armed fruit.
    aim_x: f32,
}

impl SpawnController {
    pub fn new(config: &GameConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            pending: None,
            sampler: TierSampler::from_policy(&config.spawn)?,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            spawn_y: config.spawn_y,
            width: config.boundary.width,
            cooldown_ticks: config.release_cooldown_ticks,
            cooldown_until: None,
            aim_x: config.boundary.width / 2.0,
        })
    }

    /// Samples a new tier and arms it at the last aim position.
    pub fn arm(&mut self, catalog: &FruitCatalog) -> PendingFruit {
        let tier = self.sampler.sample(&mut self.rng).min(catalog.max_tier());
        let radius = catalog.radius(tier).unwrap_or(0.0);
        let pending = PendingFruit {
            tier,
            x: clamp_x(self.aim_x, radius, self.width),
        };
        self.pending = Some(pending);
        tracing::debug!("[spawn] Armed tier {} at x={}", tier, pending.x);
        pending
    }

    /// Arms the next fruit once the release cooldown has elapsed.
    /// Returns the newly armed fruit, if any.
    pub fn update(
        &mut self,
        now: u64,
        state: GameState,
        catalog: &FruitCatalog,
    ) -> Option<PendingFruit> {
        if state != GameState::Playing {
            return None;
        }
        let until = self.cooldown_until?;
        if now < until {
            return None;
        }
        self.cooldown_until = None;
        Some(self.arm(catalog))
    }

    /// Moves the armed fruit horizontally. Returns false when the input is ignored.
    pub fn on_aim_input(&mut self, x: f32, state: GameState, catalog: &FruitCatalog) -> bool {
        if state != GameState::Playing || !x.is_finite() {
            return false;
        }
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };

        self.aim_x = x;
        let radius = catalog.radius(pending.tier).unwrap_or(0.0);
        pending.x = clamp_x(x, radius, self.width);
        true
    }

    /// Drops the armed fruit into `world` and starts the cooldown.
    pub fn release<B: PhysicsBackend>(
        &mut self,
        world: &mut PhysicsWorld<B>,
        state: GameState,
    ) -> Result<ReleaseOutcome, GameError> {
        if state != GameState::Playing {
            return Ok(ReleaseOutcome::Ignored(IgnoreReason::NotPlaying));
        }
        let now = world.current_tick();
        if self.is_cooling_down(now) {
            return Ok(ReleaseOutcome::Ignored(IgnoreReason::CoolingDown));
        }
        let Some(pending) = self.pending else {
            return Ok(ReleaseOutcome::Ignored(IgnoreReason::NoPendingFruit));
        };

        let id = world.add_body(pending.tier, [pending.x, self.spawn_y])?;
        self.pending = None;
        self.cooldown_until = Some(now + self.cooldown_ticks);

        tracing::debug!(
            "[spawn] Released {} tier={} at x={}",
            id,
            pending.tier,
            pending.x
        );
        Ok(ReleaseOutcome::Released(id))
    }

    /// Drops the armed fruit and any running cooldown.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.cooldown_until = None;
    }

    pub fn pending(&self) -> Option<&PendingFruit> {
        self.pending.as_ref()
    }

    pub fn is_cooling_down(&self, now: u64) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    pub fn spawn_y(&self) -> f32 {
        self.spawn_y
    }
}

fn clamp_x(x: f32, radius: f32, width: f32) -> f32 {
    x.clamp(radius, (width - radius).max(radius))
}
