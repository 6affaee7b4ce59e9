//! `Rapier2D` implementation of [`PhysicsBackend`].
//!
//! Fruit bodies carry their [`BodyId`] in rigid-body `user_data`, so collision
//! events map straight back to ids. Walls are tagged separately and filtered
//! out of the started-contact list.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use rapier2d::prelude::*;

use crate::config::Boundary;
use crate::physics::{BodyId, BodyState, PHYSICS_DT, PhysicsBackend};

/// Type tags for user_data encoding.
pub const USER_DATA_FRUIT: u64 = 1;
pub const USER_DATA_WALL: u64 = 2;

/// Encodes a type tag and ID into u128 user_data.
pub fn encode_user_data(type_tag: u64, id: u64) -> u128 {
    (u128::from(type_tag) << 64) | u128::from(id)
}

/// Decodes u128 user_data into (type_tag, id).
#[allow(clippy::cast_possible_truncation)]
pub fn decode_user_data(user_data: u128) -> (u64, u64) {
    let type_tag = (user_data >> 64) as u64;
    let id = user_data as u64;
    (type_tag, id)
}

/// Collects started contacts during one pipeline step.
#[derive(Default)]
struct StartedContacts {
    pairs: Mutex<Vec<(ColliderHandle, ColliderHandle)>>,
}

impl EventHandler for StartedContacts {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(h1, h2, _flags) = event {
            self.pairs.lock().push((h1, h2));
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

/// All `Rapier2D` components for one deterministic simulation.
pub struct RapierBackend {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub gravity: Vector,
    handles: HashMap<BodyId, RigidBodyHandle>,
}

impl Default for RapierBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RapierBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RapierBackend")
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl RapierBackend {
    /// Creates an empty world with zero gravity; `initialize` sets the real value.
    pub fn new() -> Self {
        let integration_parameters = IntegrationParameters {
            dt: PHYSICS_DT,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, 0.0),
            handles: HashMap::new(),
        }
    }

    fn wall(&mut self, index: u64, center: [f32; 2], half_extents: [f32; 2]) {
        let collider = ColliderBuilder::cuboid(half_extents[0], half_extents[1])
            .translation(Vector::new(center[0], center[1]))
            .friction(0.3)
            .restitution(0.2)
            .user_data(encode_user_data(USER_DATA_WALL, index))
            .build();
        self.collider_set.insert(collider);
    }

    /// Resolves a collider to the fruit id stored on its parent body.
    fn collider_to_body_id(&self, handle: ColliderHandle) -> Option<BodyId> {
        let collider = self.collider_set.get(handle)?;
        let parent = collider.parent()?;
        let (tag, id) = decode_user_data(self.rigid_body_set.get(parent)?.user_data);
        (tag == USER_DATA_FRUIT).then_some(BodyId(id))
    }
}

impl PhysicsBackend for RapierBackend {
    fn initialize(&mut self, boundary: Boundary, wall_thickness: f32, gravity: [f32; 2]) {
        self.gravity = Vector::new(gravity[0], gravity[1]);

        let Boundary { width, height } = boundary;
        let half = wall_thickness / 2.0;

        // Floor spans the full width plus both walls.
        self.wall(
            0,
            [width / 2.0, height + half],
            [width / 2.0 + wall_thickness, half],
        );
        // Side walls extend well above the arena so nothing escapes over the top.
        self.wall(1, [-half, height / 2.0], [half, height]);
        self.wall(2, [width + half, height / 2.0], [half, height]);
    }

    fn insert_ball(&mut self, id: BodyId, position: [f32; 2], radius: f32) {
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position[0], position[1]))
            .ccd_enabled(true)
            .user_data(encode_user_data(USER_DATA_FRUIT, id.0))
            .build();
        let body_handle = self.rigid_body_set.insert(rigid_body);

        let collider = ColliderBuilder::ball(radius)
            .restitution(0.2)
            .friction(0.5)
            .density(1.0)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);

        self.handles.insert(id, body_handle);
    }

    fn remove(&mut self, id: BodyId) -> bool {
        let Some(handle) = self.handles.remove(&id) else {
            return false;
        };
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    fn step(&mut self, dt: f32) -> Vec<(BodyId, BodyId)> {
        self.integration_parameters.dt = dt;
        let contacts = StartedContacts::default();

        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &contacts,
        );

        contacts
            .pairs
            .into_inner()
            .into_iter()
            .filter_map(|(h1, h2)| {
                Some((self.collider_to_body_id(h1)?, self.collider_to_body_id(h2)?))
            })
            .collect()
    }

    fn body_state(&self, id: BodyId) -> Option<BodyState> {
        let body = self.rigid_body_set.get(*self.handles.get(&id)?)?;
        let pos = body.translation();
        let vel = body.linvel();
        Some(BodyState {
            position: [pos.x, pos.y],
            velocity: [vel.x, vel.y],
        })
    }
}
