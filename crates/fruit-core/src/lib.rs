//! Fruit Drop Core Library
//!
//! Drop-and-merge physics game: fruits released into a walled arena fall under
//! gravity, and two touching fruits of the same tier fuse into the next tier.
//! Physics runs on `Rapier2D` behind a small backend trait.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod game;
pub mod merge;
pub mod monitor;
pub mod physics;
pub mod rapier;
pub mod spawn;

#[cfg(test)]
pub(crate) mod test_utils;

pub use catalog::{FruitCatalog, FruitDefinition, Tier};
pub use config::{Boundary, ConfigError, GameConfig, SpawnPolicy};
pub use error::GameError;
pub use game::{Game, GameEvent, GameState, TickReport};
pub use merge::{MergeOutcome, resolve_collisions};
pub use monitor::{GameOverMonitor, Overflow};
pub use physics::{
    BodyId, BodySnapshot, BodyState, CollisionEvent, FruitBody, PHYSICS_DT, PhysicsBackend,
    PhysicsWorld,
};
pub use rapier::RapierBackend;
pub use spawn::{IgnoreReason, PendingFruit, ReleaseOutcome, SpawnController};
