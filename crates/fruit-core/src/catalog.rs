//! Fruit tier catalog.
//!
//! The catalog is an ordered table of tiers. A tier index is the fruit's rank in
//! the merge progression: two fruits of tier `t` fuse into one of tier `t + 1`.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Index into the fruit catalog.
pub type Tier = usize;

/// One row of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FruitDefinition {
    pub name: String,
    pub radius: f32,
    /// Display color as a CSS hex string (e.g. `"#ff0000"`).
    pub color: String,
}

impl FruitDefinition {
    pub fn new(name: impl Into<String>, radius: f32, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            radius,
            color: color.into(),
        }
    }
}

/// Immutable ordered table of fruit tiers.
///
/// Radii are strictly increasing with tier. Construct through [`FruitCatalog::new`]
/// so the ordering is checked once, up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FruitDefinition>", into = "Vec<FruitDefinition>")]
pub struct FruitCatalog {
    fruits: Vec<FruitDefinition>,
}

impl FruitCatalog {
    /// Builds a catalog, rejecting empty tables and non-increasing radii.
    pub fn new(fruits: Vec<FruitDefinition>) -> Result<Self, ConfigError> {
        if fruits.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        for (tier, fruit) in fruits.iter().enumerate() {
            if !(fruit.radius.is_finite() && fruit.radius > 0.0) {
                return Err(ConfigError::NonPositiveRadius {
                    tier,
                    radius: fruit.radius,
                });
            }
        }

        for (tier, pair) in fruits.windows(2).enumerate() {
            if pair[1].radius <= pair[0].radius {
                return Err(ConfigError::NonIncreasingRadius {
                    tier: tier + 1,
                    radius: pair[1].radius,
                    previous: pair[0].radius,
                });
            }
        }

        Ok(Self { fruits })
    }

    /// The eleven-fruit classic progression, cherry through watermelon.
    pub fn classic() -> Self {
        let fruits = vec![
            FruitDefinition::new("cherry", 17.0, "#f20306"),
            FruitDefinition::new("strawberry", 24.0, "#ff624c"),
            FruitDefinition::new("grape", 33.0, "#a969ff"),
            FruitDefinition::new("dekopon", 37.0, "#ffaf02"),
            FruitDefinition::new("persimmon", 45.0, "#fc8611"),
            FruitDefinition::new("apple", 57.0, "#f41615"),
            FruitDefinition::new("pear", 66.0, "#fdf176"),
            FruitDefinition::new("peach", 79.0, "#fea0c9"),
            FruitDefinition::new("pineapple", 88.0, "#f4e008"),
            FruitDefinition::new("melon", 104.0, "#a8e34d"),
            FruitDefinition::new("watermelon", 120.0, "#2b9e3a"),
        ];
        Self { fruits }
    }

    pub fn len(&self) -> usize {
        self.fruits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fruits.is_empty()
    }

    /// Highest tier in the catalog. Merging two of these clears them.
    pub fn max_tier(&self) -> Tier {
        self.fruits.len() - 1
    }

    pub fn get(&self, tier: Tier) -> Option<&FruitDefinition> {
        self.fruits.get(tier)
    }

    /// Radius for `tier`, or `None` if the tier is outside the catalog.
    pub fn radius(&self, tier: Tier) -> Option<f32> {
        self.fruits.get(tier).map(|f| f.radius)
    }

    /// The tier two `tier` fruits merge into, or `None` at the top of the table.
    pub fn next_tier(&self, tier: Tier) -> Option<Tier> {
        (tier < self.max_tier()).then_some(tier + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, &FruitDefinition)> {
        self.fruits.iter().enumerate()
    }
}

impl Default for FruitCatalog {
    fn default() -> Self {
        Self::classic()
    }
}

impl TryFrom<Vec<FruitDefinition>> for FruitCatalog {
    type Error = ConfigError;

    fn try_from(fruits: Vec<FruitDefinition>) -> Result<Self, Self::Error> {
        Self::new(fruits)
    }
}

impl From<FruitCatalog> for Vec<FruitDefinition> {
    fn from(catalog: FruitCatalog) -> Self {
        catalog.fruits
    }
}
