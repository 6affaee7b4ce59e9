//! Test utilities: a scripted physics backend and small fixed configurations.
//!
//! `ScriptedBackend` never moves anything on its own. Tests place bodies, set
//! their velocities and inject the contacts each step should report, so merge
//! and overflow rules can be checked exactly.

use std::collections::{BTreeMap, VecDeque};

use crate::catalog::{FruitCatalog, FruitDefinition};
use crate::config::{Boundary, GameConfig, SpawnPolicy};
use crate::game::Game;
use crate::physics::{BodyId, BodyState, PhysicsBackend};

#[derive(Debug, Clone, Copy)]
struct ScriptedBall {
    state: BodyState,
    radius: f32,
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    balls: BTreeMap<BodyId, ScriptedBall>,
    contacts: VecDeque<Vec<(BodyId, BodyId)>>,
    step_deltas: Vec<f32>,
    boundary: Option<Boundary>,
}

impl ScriptedBackend {
    /// Queues the contacts reported by the next `step` call.
    pub fn queue_contacts(&mut self, pairs: Vec<(BodyId, BodyId)>) {
        self.contacts.push_back(pairs);
    }

    pub fn set_state(&mut self, id: BodyId, position: [f32; 2], velocity: [f32; 2]) {
        if let Some(ball) = self.balls.get_mut(&id) {
            ball.state = BodyState { position, velocity };
        }
    }

    pub fn radius(&self, id: BodyId) -> Option<f32> {
        self.balls.get(&id).map(|b| b.radius)
    }

    pub fn step_deltas(&self) -> &[f32] {
        &self.step_deltas
    }

    pub fn boundary(&self) -> Option<Boundary> {
        self.boundary
    }
}

impl PhysicsBackend for ScriptedBackend {
    fn initialize(&mut self, boundary: Boundary, _wall_thickness: f32, _gravity: [f32; 2]) {
        self.boundary = Some(boundary);
    }

    fn insert_ball(&mut self, id: BodyId, position: [f32; 2], radius: f32) {
        self.balls.insert(
            id,
            ScriptedBall {
                state: BodyState {
                    position,
                    velocity: [0.0, 0.0],
                },
                radius,
            },
        );
    }

    fn remove(&mut self, id: BodyId) -> bool {
        self.balls.remove(&id).is_some()
    }

    fn step(&mut self, dt: f32) -> Vec<(BodyId, BodyId)> {
        self.step_deltas.push(dt);
        self.contacts.pop_front().unwrap_or_default()
    }

    fn body_state(&self, id: BodyId) -> Option<BodyState> {
        self.balls.get(&id).map(|b| b.state)
    }
}

/// Three tiers with radii 10, 20 and 40 in a 200x300 arena.
///
/// The spawn policy always arms tier 0, overflow needs 3 resting ticks above
/// y = 50 and newly created bodies are checked immediately.
pub(crate) fn three_tier_config() -> GameConfig {
    let catalog = FruitCatalog::new(vec![
        FruitDefinition::new("small", 10.0, "#ff0000"),
        FruitDefinition::new("medium", 20.0, "#00ff00"),
        FruitDefinition::new("large", 40.0, "#0000ff"),
    ])
    .expect("valid test catalog");

    GameConfig {
        boundary: Boundary {
            width: 200.0,
            height: 300.0,
        },
        wall_thickness: 10.0,
        spawn_y: 20.0,
        ceiling_y: 50.0,
        debounce_ticks: 3,
        rest_speed: 1.0,
        spawn_grace_ticks: 0,
        release_cooldown_ticks: 2,
        max_substeps: 4,
        seed: 1,
        spawn: SpawnPolicy::Uniform { count: 1 },
        catalog,
        ..GameConfig::default()
    }
}

/// A started game on the scripted backend.
pub(crate) fn scripted_game() -> Game<ScriptedBackend> {
    let mut game = Game::with_backend(ScriptedBackend::default(), three_tier_config())
        .expect("valid test config");
    assert!(game.start());
    game
}
