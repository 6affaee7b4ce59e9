//! Game configuration, supplied once at initialization.
//!
//! Coordinates are screen-space pixels with +y pointing down, matching the
//! gravity convention of the physics layer.

use serde::{Deserialize, Serialize};

use crate::catalog::{FruitCatalog, Tier};
use crate::physics::PHYSICS_DT;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Fruit catalog must contain at least one tier")]
    EmptyCatalog,

    #[error("Tier {tier} has non-positive radius {radius}")]
    NonPositiveRadius { tier: Tier, radius: f32 },

    #[error("Tier {tier} radius {radius} is not larger than previous radius {previous}")]
    NonIncreasingRadius {
        tier: Tier,
        radius: f32,
        previous: f32,
    },

    #[error("Invalid boundary {width}x{height}")]
    InvalidBoundary { width: f32, height: f32 },

    #[error("Ceiling line {ceiling_y} must lie inside the boundary height {height}")]
    CeilingOutOfBounds { ceiling_y: f32, height: f32 },

    #[error("Spawn line {spawn_y} must lie inside the boundary height {height}")]
    SpawnOutOfBounds { spawn_y: f32, height: f32 },

    #[error("Invalid physics parameter: {0}")]
    InvalidPhysics(String),

    #[error("Largest fruit (radius {radius}) does not fit in boundary width {width}")]
    FruitTooWide { radius: f32, width: f32 },

    #[error("Invalid spawn policy: {0}")]
    InvalidSpawnPolicy(String),

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),
}

/// Arena dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub width: f32,
    pub height: f32,
}

impl Default for Boundary {
    fn default() -> Self {
        Self {
            width: 620.0,
            height: 850.0,
        }
    }
}

/// How the next pending fruit's tier is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpawnPolicy {
    /// Uniform over tiers `0..count`.
    Uniform { count: usize },
    /// Weighted over tiers `0..weights.len()`.
    Weighted { weights: Vec<u32> },
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        Self::Uniform { count: 5 }
    }
}

impl SpawnPolicy {
    fn validate(&self, catalog: &FruitCatalog) -> Result<(), ConfigError> {
        match self {
            Self::Uniform { count } => {
                if *count == 0 || *count > catalog.len() {
                    return Err(ConfigError::InvalidSpawnPolicy(format!(
                        "uniform count {count} must be within 1..={}",
                        catalog.len()
                    )));
                }
            }
            Self::Weighted { weights } => {
                if weights.is_empty() || weights.len() > catalog.len() {
                    return Err(ConfigError::InvalidSpawnPolicy(format!(
                        "{} weights given for a catalog of {} tiers",
                        weights.len(),
                        catalog.len()
                    )));
                }
                if weights.iter().all(|w| *w == 0) {
                    return Err(ConfigError::InvalidSpawnPolicy(
                        "all weights are zero".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Complete game configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub boundary: Boundary,
    /// Gravity vector in pixels/s².
    pub gravity: [f32; 2],
    pub wall_thickness: f32,
    /// Vertical position at which released fruits enter the arena.
    pub spawn_y: f32,
    /// Bodies resting above this line (smaller y) count as overflowing.
    pub ceiling_y: f32,
    /// Consecutive overflowing ticks required before the game ends.
    pub debounce_ticks: u32,
    /// Speed (pixels/s) at or below which a body counts as resting.
    pub rest_speed: f32,
    /// Ticks after creation during which a body is ignored by the overflow check.
    pub spawn_grace_ticks: u64,
    /// Ticks after a release before the next fruit is armed.
    pub release_cooldown_ticks: u64,
    /// Fixed simulation timestep in seconds.
    pub timestep: f32,
    /// Upper bound on ticks run for one host frame.
    pub max_substeps: u32,
    pub seed: u64,
    pub spawn: SpawnPolicy,
    pub catalog: FruitCatalog,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            boundary: Boundary::default(),
            gravity: [0.0, 981.0],
            wall_thickness: 30.0,
            spawn_y: 50.0,
            ceiling_y: 150.0,
            debounce_ticks: 60,
            rest_speed: 5.0,
            spawn_grace_ticks: 60,
            release_cooldown_ticks: 30,
            timestep: PHYSICS_DT,
            max_substeps: 4,
            seed: 0,
            spawn: SpawnPolicy::default(),
            catalog: FruitCatalog::classic(),
        }
    }
}

impl GameConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Checks cross-field constraints. The catalog validates itself on construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Boundary { width, height } = self.boundary;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConfigError::InvalidBoundary { width, height });
        }

        if !(self.ceiling_y > 0.0 && self.ceiling_y < height) {
            return Err(ConfigError::CeilingOutOfBounds {
                ceiling_y: self.ceiling_y,
                height,
            });
        }

        if !(self.spawn_y > 0.0 && self.spawn_y < height) {
            return Err(ConfigError::SpawnOutOfBounds {
                spawn_y: self.spawn_y,
                height,
            });
        }

        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(ConfigError::InvalidPhysics(format!(
                "gravity {:?} must be finite",
                self.gravity
            )));
        }
        if !(self.wall_thickness.is_finite() && self.wall_thickness > 0.0) {
            return Err(ConfigError::InvalidPhysics(format!(
                "wall_thickness {} must be positive",
                self.wall_thickness
            )));
        }
        if !(self.rest_speed.is_finite() && self.rest_speed >= 0.0) {
            return Err(ConfigError::InvalidPhysics(format!(
                "rest_speed {} must be non-negative",
                self.rest_speed
            )));
        }

        let widest = self.catalog.radius(self.catalog.max_tier()).unwrap_or(0.0);
        if widest * 2.0 > width {
            return Err(ConfigError::FruitTooWide {
                radius: widest,
                width,
            });
        }

        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(ConfigError::InvalidTiming(format!(
                "timestep {} must be positive",
                self.timestep
            )));
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::InvalidTiming(
                "max_substeps must be at least 1".to_string(),
            ));
        }
        if self.debounce_ticks == 0 {
            return Err(ConfigError::InvalidTiming(
                "debounce_ticks must be at least 1".to_string(),
            ));
        }

        self.spawn.validate(&self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip_keeps_catalog() {
        let config = GameConfig::default();
        let json = config.to_json().unwrap();
        let parsed = GameConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameConfig::from_json(
            r#"{ "seed": 7, "boundary": { "width": 400, "height": 600 }, "spawn": { "mode": "uniform", "count": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.boundary.width, 400.0);
        assert_eq!(config.spawn, SpawnPolicy::Uniform { count: 3 });
        assert_eq!(config.catalog.len(), 11);
    }

    #[test]
    fn test_rejects_ceiling_outside_boundary() {
        let config = GameConfig {
            ceiling_y: 900.0,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CeilingOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_spawn_outside_boundary() {
        for spawn_y in [2000.0, 0.0, -10.0, f32::NAN] {
            let config = GameConfig {
                spawn_y,
                ..GameConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::SpawnOutOfBounds { .. })),
                "spawn_y {spawn_y} accepted"
            );
        }
    }

    #[test]
    fn test_rejects_non_finite_gravity() {
        let config = GameConfig {
            gravity: [0.0, f32::NAN],
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPhysics(_))));

        let config = GameConfig {
            gravity: [f32::INFINITY, 981.0],
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPhysics(_))));
    }

    #[test]
    fn test_rejects_negative_rest_speed() {
        for rest_speed in [-1.0, f32::NAN] {
            let config = GameConfig {
                rest_speed,
                ..GameConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidPhysics(_))));
        }

        let config = GameConfig {
            rest_speed: 0.0,
            ..GameConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_wall_thickness() {
        for wall_thickness in [-30.0, 0.0, f32::INFINITY] {
            let config = GameConfig {
                wall_thickness,
                ..GameConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidPhysics(_))));
        }
    }

    #[test]
    fn test_rejects_spawn_policy_beyond_catalog() {
        let config = GameConfig {
            spawn: SpawnPolicy::Uniform { count: 12 },
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSpawnPolicy(_))
        ));

        let config = GameConfig {
            spawn: SpawnPolicy::Weighted { weights: vec![0, 0] },
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSpawnPolicy(_))
        ));
    }

    #[test]
    fn test_rejects_catalog_too_wide_for_arena() {
        let config = GameConfig {
            boundary: Boundary {
                width: 200.0,
                height: 850.0,
            },
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FruitTooWide { .. })
        ));
    }

    #[test]
    fn test_rejects_unsorted_catalog_in_json() {
        let json = r##"{ "catalog": [
            { "name": "big", "radius": 40, "color": "#000" },
            { "name": "small", "radius": 10, "color": "#fff" }
        ] }"##;
        assert!(matches!(GameConfig::from_json(json), Err(ConfigError::Parse(_))));
    }
}
