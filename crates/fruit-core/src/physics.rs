//! Physics world adapter.
//!
//! `PhysicsWorld` owns every live fruit body and is the only place where bodies
//! are created or destroyed. The rigid-body engine itself sits behind the
//! [`PhysicsBackend`] trait so the adapter never depends on one engine's API.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::catalog::{FruitCatalog, Tier};
use crate::config::{Boundary, GameConfig};
use crate::error::GameError;
use crate::rapier::RapierBackend;

/// Fixed timestep for physics simulation (60Hz).
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// Largest delta a single step will integrate. Longer frames are clamped.
pub const MAX_STEP_DT: f32 = 1.0 / 30.0;

/// Unique, never reused identifier of a fruit body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kinematic state read back from the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
}

impl BodyState {
    pub fn speed(&self) -> f32 {
        let [vx, vy] = self.velocity;
        (vx * vx + vy * vy).sqrt()
    }
}

/// Capabilities the game needs from a 2D rigid-body engine.
pub trait PhysicsBackend {
    /// Builds the static floor and side walls and sets gravity. Called once.
    fn initialize(&mut self, boundary: Boundary, wall_thickness: f32, gravity: [f32; 2]);

    /// Inserts a dynamic circular body tagged with `id`.
    fn insert_ball(&mut self, id: BodyId, position: [f32; 2], radius: f32);

    /// Removes the body tagged with `id`. Returns false if it was not present.
    fn remove(&mut self, id: BodyId) -> bool;

    /// Advances the simulation by `dt` seconds and returns the body pairs whose
    /// contact started during this step, in engine report order.
    fn step(&mut self, dt: f32) -> Vec<(BodyId, BodyId)>;

    fn body_state(&self, id: BodyId) -> Option<BodyState>;
}

/// A live fruit owned by the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FruitBody {
    pub id: BodyId,
    pub tier: Tier,
    /// Always the catalog radius for `tier`. A tier change is a destroy + recreate.
    pub radius: f32,
    /// World tick at which the body was inserted.
    pub created_tick: u64,
}

/// Contact between two fruit bodies that began during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionEvent {
    pub a: BodyId,
    pub b: BodyId,
}

/// Read-only view of one body for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub tier: Tier,
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub radius: f32,
    pub created_tick: u64,
}

/// The simulation world: boundary geometry, gravity, clock and fruit bodies.
pub struct PhysicsWorld<B: PhysicsBackend = RapierBackend> {
    backend: B,
    catalog: FruitCatalog,
    boundary: Boundary,
    bodies: BTreeMap<BodyId, FruitBody>,
    next_id: u64,
    tick: u64,
}

impl<B: PhysicsBackend> fmt::Debug for PhysicsWorld<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("tick", &self.tick)
            .field("body_count", &self.bodies.len())
            .field("boundary", &self.boundary)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld<RapierBackend> {
    /// Creates a rapier-backed world for `config`.
    pub fn new(config: &GameConfig) -> Self {
        Self::with_backend(RapierBackend::new(), config)
    }
}

impl<B: PhysicsBackend> PhysicsWorld<B> {
    /// Initializes `backend` with the configured boundary and gravity.
    pub fn with_backend(mut backend: B, config: &GameConfig) -> Self {
        backend.initialize(config.boundary, config.wall_thickness, config.gravity);
        tracing::debug!(
            "[physics] Initialized {}x{} arena, gravity {:?}",
            config.boundary.width,
            config.boundary.height,
            config.gravity
        );

        Self {
            backend,
            catalog: config.catalog.clone(),
            boundary: config.boundary,
            bodies: BTreeMap::new(),
            next_id: 0,
            tick: 0,
        }
    }

    /// Inserts a new dynamic fruit of `tier` at `position`, sized from the catalog.
    pub fn add_body(&mut self, tier: Tier, position: [f32; 2]) -> Result<BodyId, GameError> {
        let radius = self.catalog.radius(tier).ok_or(GameError::InvalidTier {
            tier,
            tier_count: self.catalog.len(),
        })?;
        if !position.iter().all(|v| v.is_finite()) {
            return Err(GameError::NonFinitePosition(position));
        }

        let id = BodyId(self.next_id);
        self.next_id += 1;

        self.backend.insert_ball(id, position, radius);
        self.bodies.insert(
            id,
            FruitBody {
                id,
                tier,
                radius,
                created_tick: self.tick,
            },
        );

        tracing::trace!("[physics] Added body {} tier={} at {:?}", id, tier, position);
        Ok(id)
    }

    /// Removes a body, failing with `StaleBodyReference` if it is already gone.
    pub fn try_remove_body(&mut self, id: BodyId) -> Result<FruitBody, GameError> {
        let body = self
            .bodies
            .remove(&id)
            .ok_or(GameError::StaleBodyReference(id))?;
        self.backend.remove(id);
        Ok(body)
    }

    /// Removes a body. Removing a body that no longer exists is a no-op.
    pub fn remove_body(&mut self, id: BodyId) -> Option<FruitBody> {
        match self.try_remove_body(id) {
            Ok(body) => Some(body),
            Err(err) => {
                tracing::trace!("[physics] Ignoring removal: {}", err);
                None
            }
        }
    }

    /// Advances the simulation by `dt` (clamped to `(0, MAX_STEP_DT]`) and
    /// returns the fruit pairs whose contact started during the step.
    pub fn step(&mut self, dt: f32) -> Vec<CollisionEvent> {
        let dt = if dt.is_finite() && dt > 0.0 {
            dt.min(MAX_STEP_DT)
        } else {
            PHYSICS_DT
        };

        let pairs = self.backend.step(dt);
        self.tick += 1;

        pairs
            .into_iter()
            .filter(|(a, b)| a != b && self.bodies.contains_key(a) && self.bodies.contains_key(b))
            .map(|(a, b)| CollisionEvent { a, b })
            .collect()
    }

    /// Returns every live body ordered by id.
    pub fn snapshot(&self) -> Vec<BodySnapshot> {
        self.bodies
            .values()
            .filter_map(|body| {
                let state = self.backend.body_state(body.id)?;
                Some(BodySnapshot {
                    id: body.id,
                    tier: body.tier,
                    position: state.position,
                    velocity: state.velocity,
                    radius: body.radius,
                    created_tick: body.created_tick,
                })
            })
            .collect()
    }

    pub fn body(&self, id: BodyId) -> Option<&FruitBody> {
        self.bodies.get(&id)
    }

    pub fn body_state(&self, id: BodyId) -> Option<BodyState> {
        if !self.bodies.contains_key(&id) {
            return None;
        }
        self.backend.body_state(id)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Number of completed steps.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn catalog(&self) -> &FruitCatalog {
        &self.catalog
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Computes a hash of tick, ids, tiers and kinematic state.
    /// Two worlds fed identical input produce identical hashes.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);

        for body in self.snapshot() {
            body.id.hash(&mut hasher);
            body.tier.hash(&mut hasher);
            for value in body.position.into_iter().chain(body.velocity) {
                hash_f32(value, &mut hasher);
            }
        }

        hasher.finish()
    }
}

/// Hashes a f32 value by converting to bits.
fn hash_f32(value: f32, hasher: &mut impl Hasher) {
    value.to_bits().hash(hasher);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedBackend, three_tier_config};

    fn scripted_world() -> PhysicsWorld<ScriptedBackend> {
        PhysicsWorld::with_backend(ScriptedBackend::default(), &three_tier_config())
    }

    #[test]
    fn test_initialize_passes_boundary_to_backend() {
        let world = scripted_world();
        assert_eq!(world.backend().boundary(), Some(world.boundary()));
        assert_eq!(world.current_tick(), 0);
    }

    #[test]
    fn test_add_body_uses_catalog_radius() {
        let mut world = scripted_world();
        let id = world.add_body(1, [100.0, 100.0]).unwrap();

        let body = world.body(id).unwrap();
        assert_eq!(body.tier, 1);
        assert_eq!(body.radius, 20.0);
        assert_eq!(world.backend().radius(id), Some(20.0));
    }

    #[test]
    fn test_add_body_rejects_invalid_tier() {
        let mut world = scripted_world();
        let result = world.add_body(3, [100.0, 100.0]);

        assert_eq!(
            result,
            Err(GameError::InvalidTier {
                tier: 3,
                tier_count: 3
            })
        );
        assert!(world.is_empty());
    }

    #[test]
    fn test_add_body_rejects_non_finite_position() {
        let mut world = scripted_world();
        let result = world.add_body(0, [f32::NAN, 100.0]);

        assert!(matches!(result, Err(GameError::NonFinitePosition(_))));
        assert!(world.is_empty());
        assert_eq!(world.add_body(0, [10.0, 10.0]).unwrap(), BodyId(0));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut world = scripted_world();
        let first = world.add_body(0, [50.0, 50.0]).unwrap();
        world.remove_body(first);
        let second = world.add_body(0, [50.0, 50.0]).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_remove_stale_body_is_noop() {
        let mut world = scripted_world();
        let id = world.add_body(0, [50.0, 50.0]).unwrap();

        assert!(world.remove_body(id).is_some());
        assert!(world.remove_body(id).is_none());
        assert_eq!(
            world.try_remove_body(id),
            Err(GameError::StaleBodyReference(id))
        );
    }

    #[test]
    fn test_step_drops_pairs_with_unknown_bodies() {
        let mut world = scripted_world();
        let a = world.add_body(0, [50.0, 50.0]).unwrap();
        let b = world.add_body(0, [60.0, 50.0]).unwrap();

        world
            .backend_mut()
            .queue_contacts(vec![(a, b), (a, BodyId(99)), (b, b)]);
        let events = world.step(PHYSICS_DT);

        assert_eq!(events, vec![CollisionEvent { a, b }]);
        assert_eq!(world.current_tick(), 1);
    }

    #[test]
    fn test_step_clamps_delta() {
        let mut world = scripted_world();
        world.step(1.0);
        world.step(-1.0);

        assert_eq!(world.backend().step_deltas(), &[MAX_STEP_DT, PHYSICS_DT]);
    }

    #[test]
    fn test_snapshot_is_ordered_by_id() {
        let mut world = scripted_world();
        let ids: Vec<_> = (0..3)
            .map(|i| world.add_body(0, [10.0 + i as f32 * 30.0, 50.0]).unwrap())
            .collect();

        let snapshot = world.snapshot();
        let snapshot_ids: Vec<_> = snapshot.iter().map(|b| b.id).collect();
        assert_eq!(snapshot_ids, ids);
        assert_eq!(snapshot[2].position, [70.0, 50.0]);
    }
}
