//! Fruit Drop headless runner
//!
//! Plays one game with a random dropping policy until the stack overflows or
//! the tick limit is reached, then prints a JSON summary.
//!
//! Usage: `fruit-sim [config.json] [max_ticks]`

use anyhow::Context;
use fruit_core::{Game, GameConfig, GameEvent, GameState, MergeOutcome, Tier};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_MAX_TICKS: u64 = 60 * 60 * 10;

/// Points for creating a fruit of `tier`: 1, 3, 6, 10, ...
fn merge_points(tier: Tier) -> u64 {
    let n = tier as u64 + 1;
    n * (n + 1) / 2
}

#[derive(Debug, Default)]
struct Scoreboard {
    score: u64,
    merges: u64,
    cleared: u64,
    drops: u64,
    best_tier: Tier,
}

impl Scoreboard {
    fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::Released { .. } => self.drops += 1,
            GameEvent::Merge {
                outcome: MergeOutcome::Merged { to_tier, .. },
            } => {
                self.merges += 1;
                self.score += merge_points(*to_tier);
                self.best_tier = self.best_tier.max(*to_tier);
            }
            GameEvent::Merge {
                outcome: MergeOutcome::Cleared { tier, .. },
            } => {
                self.cleared += 1;
                self.score += merge_points(*tier + 1);
            }
            GameEvent::Started { .. } | GameEvent::Armed { .. } | GameEvent::GameOver { .. } => {}
        }
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    GameConfig::from_json(&json).with_context(|| format!("parsing {path}"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(args.first().map(String::as_str))?;
    let max_ticks = match args.get(1) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid max_ticks: {raw}"))?,
        None => DEFAULT_MAX_TICKS,
    };

    let width = config.boundary.width;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(1));
    let mut game = Game::new(config).context("invalid configuration")?;
    let mut scoreboard = Scoreboard::default();

    game.start();
    tracing::info!("[sim] Running up to {} ticks", max_ticks);

    let mut last_report = None;
    for _ in 0..max_ticks {
        if game.pending().is_some() {
            game.queue_aim(rng.random_range(0.0..width));
            game.queue_drop();
        }

        let report = game.tick()?;
        for event in &report.events {
            scoreboard.record(event);
        }
        let finished = report.state == GameState::GameOver;
        last_report = Some(report);
        if finished {
            break;
        }
    }

    let bodies = last_report.as_ref().map_or(0, |r| r.bodies.len());
    tracing::info!(
        "[sim] Finished at tick {} with score {} ({} drops, {} merges)",
        game.current_tick(),
        scoreboard.score,
        scoreboard.drops,
        scoreboard.merges
    );

    let summary = serde_json::json!({
        "state": game.state(),
        "ticks": game.current_tick(),
        "score": scoreboard.score,
        "drops": scoreboard.drops,
        "merges": scoreboard.merges,
        "cleared": scoreboard.cleared,
        "best_tier": game.config().catalog.get(scoreboard.best_tier).map(|f| f.name.clone()),
        "bodies": bodies,
        "state_hash": game.state_hash(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_points_are_triangular() {
        assert_eq!(merge_points(0), 1);
        assert_eq!(merge_points(1), 3);
        assert_eq!(merge_points(2), 6);
        assert_eq!(merge_points(10), 66);
    }

    #[test]
    fn test_scoreboard_counts_merges() {
        let mut board = Scoreboard::default();
        board.record(&GameEvent::Merge {
            outcome: MergeOutcome::Merged {
                consumed: [fruit_core::BodyId(0), fruit_core::BodyId(1)],
                from_tier: 0,
                to_tier: 1,
                created: fruit_core::BodyId(2),
                position: [0.0, 0.0],
            },
        });

        assert_eq!(board.merges, 1);
        assert_eq!(board.score, 3);
        assert_eq!(board.best_tier, 1);
    }
}
