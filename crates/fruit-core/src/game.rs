//! Game state machine and the per-tick loop.
//!
//! Each tick runs in a fixed order: arm/aim/release from buffered input, step
//! the physics world, resolve merges from that step's contacts, then check for
//! overflow. The report returned by [`Game::tick`] is the only thing the host
//! needs for drawing and scoring.

use serde::{Deserialize, Serialize};

use crate::catalog::Tier;
use crate::config::{ConfigError, GameConfig};
use crate::error::GameError;
use crate::merge::{MergeOutcome, resolve_collisions};
use crate::monitor::{GameOverMonitor, Overflow};
use crate::physics::{BodyId, BodySnapshot, PhysicsBackend, PhysicsWorld};
use crate::rapier::RapierBackend;
use crate::spawn::{PendingFruit, ReleaseOutcome, SpawnController};

/// Phase of a single game. `GameOver` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Ready,
    Playing,
    GameOver,
}

/// Notification for external collaborators (presentation, scoring).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Started {
        tick: u64,
    },
    Armed {
        fruit: PendingFruit,
    },
    Released {
        body: BodyId,
        tier: Tier,
        position: [f32; 2],
    },
    Merge {
        outcome: MergeOutcome,
    },
    GameOver {
        tick: u64,
        overflow: Overflow,
    },
}

/// Everything published after one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub state: GameState,
    pub bodies: Vec<BodySnapshot>,
    pub pending: Option<PendingFruit>,
    pub events: Vec<GameEvent>,
}

/// Host input collected between ticks.
#[derive(Debug, Clone, Default)]
struct InputBuffer {
    aim: Option<f32>,
    drop: bool,
}

/// One game: world, spawn controller, overflow monitor and state.
///
/// A finished game cannot be restarted; build a new `Game` instead.
pub struct Game<B: PhysicsBackend = RapierBackend> {
    config: GameConfig,
    world: PhysicsWorld<B>,
    spawner: SpawnController,
    monitor: GameOverMonitor,
    state: GameState,
    input: InputBuffer,
    /// Host frame time not yet consumed by whole ticks.
    accumulator: f32,
    /// Events raised outside `tick` (start, direct release), flushed by the next report.
    queued_events: Vec<GameEvent>,
}

impl<B: PhysicsBackend> std::fmt::Debug for Game<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("state", &self.state)
            .field("world", &self.world)
            .field("pending", &self.spawner.pending())
            .finish_non_exhaustive()
    }
}

impl Game<RapierBackend> {
    /// Creates a rapier-backed game from a validated configuration.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_backend(RapierBackend::new(), config)
    }
}

impl<B: PhysicsBackend> Game<B> {
    pub fn with_backend(backend: B, config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            world: PhysicsWorld::with_backend(backend, &config),
            spawner: SpawnController::new(&config)?,
            monitor: GameOverMonitor::new(&config),
            state: GameState::Ready,
            input: InputBuffer::default(),
            accumulator: 0.0,
            queued_events: Vec::new(),
            config,
        })
    }

    /// Arms the first fruit and enters `Playing`.
    /// Returns false if the game has already started.
    pub fn start(&mut self) -> bool {
        if self.state != GameState::Ready {
            return false;
        }

        self.state = GameState::Playing;
        let fruit = self.spawner.arm(self.world.catalog());
        self.queued_events.push(GameEvent::Started {
            tick: self.world.current_tick(),
        });
        self.queued_events.push(GameEvent::Armed { fruit });

        tracing::info!("[game] Started (seed={})", self.config.seed);
        true
    }

    /// Buffers an aim position for the next tick. Later calls overwrite earlier ones.
    pub fn queue_aim(&mut self, x: f32) {
        self.input.aim = Some(x);
    }

    /// Buffers a drop request for the next tick.
    pub fn queue_drop(&mut self) {
        self.input.drop = true;
    }

    /// Aims the armed fruit immediately.
    pub fn aim(&mut self, x: f32) -> bool {
        self.spawner.on_aim_input(x, self.state, self.world.catalog())
    }

    /// Releases the armed fruit immediately.
    pub fn release(&mut self) -> Result<ReleaseOutcome, GameError> {
        let outcome = self.spawner.release(&mut self.world, self.state)?;
        match outcome {
            ReleaseOutcome::Released(body) => {
                if let Some(event) = self.released_event(body) {
                    self.queued_events.push(event);
                }
            }
            ReleaseOutcome::Ignored(reason) => {
                tracing::trace!("[game] Release ignored: {:?}", reason);
            }
        }
        Ok(outcome)
    }

    fn released_event(&self, body: BodyId) -> Option<GameEvent> {
        let tier = self.world.body(body)?.tier;
        let position = self.world.body_state(body)?.position;
        Some(GameEvent::Released {
            body,
            tier,
            position,
        })
    }

    /// Runs one fixed tick and returns the published report.
    pub fn tick(&mut self) -> Result<TickReport, GameError> {
        let input = std::mem::take(&mut self.input);

        if self.state == GameState::Playing {
            // 1. Input
            if let Some(fruit) =
                self.spawner
                    .update(self.world.current_tick(), self.state, self.world.catalog())
            {
                self.queued_events.push(GameEvent::Armed { fruit });
            }
            if let Some(x) = input.aim {
                self.aim(x);
            }
            if input.drop {
                self.release()?;
            }

            // 2. Physics
            let collisions = self.world.step(self.config.timestep);

            // 3. Merges
            let outcomes = resolve_collisions(&mut self.world, &collisions, self.state)?;
            self.queued_events
                .extend(outcomes.into_iter().map(|outcome| GameEvent::Merge { outcome }));
        }

        // 4. Overflow
        let bodies = self.world.snapshot();
        if self.state == GameState::Playing {
            let tick = self.world.current_tick();
            if let Some(overflow) = self.monitor.check(&bodies, tick) {
                self.state = GameState::GameOver;
                self.spawner.cancel();
                tracing::info!(
                    "[game] Game over at tick {} ({} bodies in play)",
                    tick,
                    bodies.len()
                );
                self.queued_events.push(GameEvent::GameOver { tick, overflow });
            }
        }

        // 5. Publish
        Ok(TickReport {
            tick: self.world.current_tick(),
            state: self.state,
            bodies,
            pending: self.spawner.pending().copied(),
            events: std::mem::take(&mut self.queued_events),
        })
    }

    /// Feeds host frame time and runs as many whole ticks as it covers, capped
    /// at `max_substeps`. Time beyond the cap is dropped.
    pub fn advance(&mut self, elapsed: f32) -> Result<Vec<TickReport>, GameError> {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator += elapsed;
        }

        let timestep = self.config.timestep;
        let mut reports = Vec::new();
        while self.accumulator >= timestep {
            if reports.len() >= self.config.max_substeps as usize {
                self.accumulator = 0.0;
                break;
            }
            self.accumulator -= timestep;
            reports.push(self.tick()?);
        }
        Ok(reports)
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn pending(&self) -> Option<&PendingFruit> {
        self.spawner.pending()
    }

    pub fn snapshot(&self) -> Vec<BodySnapshot> {
        self.world.snapshot()
    }

    pub fn world(&self) -> &PhysicsWorld<B> {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut PhysicsWorld<B> {
        &mut self.world
    }

    pub fn monitor(&self) -> &GameOverMonitor {
        &self.monitor
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn current_tick(&self) -> u64 {
        self.world.current_tick()
    }

    /// Hash of the world state for determinism checks.
    pub fn state_hash(&self) -> u64 {
        self.world.compute_hash()
    }
}
