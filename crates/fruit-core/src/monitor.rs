//! Game-over detection.
//!
//! A body overflows when it rests above the ceiling line: its center is above
//! the line (smaller y), it is past its spawn grace period, and its speed is at
//! or below the rest threshold. The game ends once any body has overflowed for
//! `debounce_ticks` consecutive checks, so a fruit bouncing through the line
//! during a drop does not count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Tier;
use crate::config::GameConfig;
use crate::physics::{BodyId, BodySnapshot};

/// The body that ended the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overflow {
    pub body: BodyId,
    pub tier: Tier,
    pub position: [f32; 2],
}

#[derive(Debug, Clone)]
pub struct GameOverMonitor {
    ceiling_y: f32,
    debounce_ticks: u32,
    rest_speed: f32,
    grace_ticks: u64,
    /// Consecutive overflowing checks per body.
    counters: BTreeMap<BodyId, u32>,
}

impl GameOverMonitor {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            ceiling_y: config.ceiling_y,
            debounce_ticks: config.debounce_ticks,
            rest_speed: config.rest_speed,
            grace_ticks: config.spawn_grace_ticks,
            counters: BTreeMap::new(),
        }
    }

    fn is_overflowing(&self, body: &BodySnapshot, now: u64) -> bool {
        let [vx, vy] = body.velocity;
        let speed = (vx * vx + vy * vy).sqrt();
        body.position[1] < self.ceiling_y
            && speed <= self.rest_speed
            && now.saturating_sub(body.created_tick) >= self.grace_ticks
    }

    /// Updates the debounce counters from `snapshot` and reports the first body
    /// (lowest id) whose overflow has lasted long enough.
    pub fn check(&mut self, snapshot: &[BodySnapshot], now: u64) -> Option<Overflow> {
        let mut next = BTreeMap::new();
        for body in snapshot {
            if self.is_overflowing(body, now) {
                let count = self.counters.get(&body.id).copied().unwrap_or(0) + 1;
                next.insert(body.id, count);
            }
        }
        self.counters = next;

        let (&id, _) = self
            .counters
            .iter()
            .find(|(_, count)| **count >= self.debounce_ticks)?;
        let body = snapshot.iter().find(|b| b.id == id)?;

        tracing::info!(
            "[monitor] {} (tier {}) rested above ceiling for {} ticks",
            id,
            body.tier,
            self.debounce_ticks
        );
        Some(Overflow {
            body: id,
            tier: body.tier,
            position: body.position,
        })
    }

    /// Current consecutive-overflow counts, keyed by body.
    pub fn counters(&self) -> &BTreeMap<BodyId, u32> {
        &self.counters
    }

    pub fn ceiling_y(&self) -> f32 {
        self.ceiling_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::three_tier_config;

    fn body(id: u64, y: f32, vy: f32, created_tick: u64) -> BodySnapshot {
        BodySnapshot {
            id: BodyId(id),
            tier: 0,
            position: [100.0, y],
            velocity: [0.0, vy],
            radius: 10.0,
            created_tick,
        }
    }

    #[test]
    fn test_sustained_overflow_triggers() {
        let mut monitor = GameOverMonitor::new(&three_tier_config());
        let snapshot = [body(0, 30.0, 0.0, 0)];

        assert!(monitor.check(&snapshot, 1).is_none());
        assert!(monitor.check(&snapshot, 2).is_none());
        let overflow = monitor.check(&snapshot, 3).unwrap();

        assert_eq!(overflow.body, BodyId(0));
        assert_eq!(overflow.position, [100.0, 30.0]);
    }

    #[test]
    fn test_interrupted_overflow_resets_counter() {
        let mut monitor = GameOverMonitor::new(&three_tier_config());
        let above = [body(0, 30.0, 0.0, 0)];
        let below = [body(0, 80.0, 0.0, 0)];

        monitor.check(&above, 1);
        monitor.check(&above, 2);
        monitor.check(&below, 3);
        assert!(monitor.counters().is_empty());

        assert!(monitor.check(&above, 4).is_none());
        assert!(monitor.check(&above, 5).is_none());
        assert!(monitor.check(&above, 6).is_some());
    }

    #[test]
    fn test_moving_body_is_not_resting() {
        let mut monitor = GameOverMonitor::new(&three_tier_config());
        let snapshot = [body(0, 30.0, 50.0, 0)];

        for tick in 1..=10 {
            assert!(monitor.check(&snapshot, tick).is_none());
        }
    }

    #[test]
    fn test_grace_period_ignores_new_bodies() {
        let config = GameConfig {
            spawn_grace_ticks: 5,
            ..three_tier_config()
        };
        let mut monitor = GameOverMonitor::new(&config);
        let snapshot = [body(0, 30.0, 0.0, 10)];

        for tick in 10..15 {
            assert!(monitor.check(&snapshot, tick).is_none());
        }
        assert!(monitor.check(&snapshot, 15).is_none());
        assert!(monitor.check(&snapshot, 16).is_none());
        assert!(monitor.check(&snapshot, 17).is_some());
    }

    #[test]
    fn test_removed_bodies_drop_their_counters() {
        let mut monitor = GameOverMonitor::new(&three_tier_config());
        monitor.check(&[body(0, 30.0, 0.0, 0)], 1);
        monitor.check(&[body(0, 30.0, 0.0, 0)], 2);

        monitor.check(&[body(1, 30.0, 0.0, 0)], 3);
        assert_eq!(monitor.counters().get(&BodyId(1)), Some(&1));
        assert!(!monitor.counters().contains_key(&BodyId(0)));
    }
}
