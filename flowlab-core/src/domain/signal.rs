//! Discrete signal emitted once per bar.

use serde::{Deserialize, Serialize};

/// Directional outcome of a bar. Exactly one holds per bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Buy,
    Sell,
    #[default]
    None,
}

impl Direction {
    /// +1 for buy, -1 for sell, 0 for none.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
            Direction::None => 0.0,
        }
    }
}

/// Signal with its strength.
///
/// Strength is the magnitude of the composite score in `(0, 100]` when a
/// signal fires and exactly 0 otherwise; the direction carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    pub strength: f64,
}

impl Signal {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn buy(score: f64) -> Self {
        Self {
            direction: Direction::Buy,
            strength: score.clamp(-100.0, 100.0),
        }
    }

    pub fn sell(score: f64) -> Self {
        Self {
            direction: Direction::Sell,
            strength: -score.clamp(-100.0, 0.0),
        }
    }

    pub fn is_none(&self) -> bool {
        self.direction == Direction::None
    }
}
