//! Error taxonomy.
//!
//! Only malformed bars and bad configuration are errors. Short history and
//! rangeless or volumeless bars are handled inline as neutral outputs.

use crate::domain::{BarError, Factor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The bar was rejected before any state changed. `index` is the logical
    /// index it would have received.
    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: BarError },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{name} must be >= 1")]
    ZeroPeriod { name: &'static str },

    #[error("{name} must be >= {min}")]
    PeriodTooShort { name: &'static str, min: usize },

    #[error("{name} must be > 0 (got {value})")]
    NonPositive { name: &'static str, value: f64 },

    #[error("factor caps must sum to 100 (got {sum})")]
    CapSum { sum: f64 },

    #[error("weight given for disabled factor {0}")]
    DisabledFactor(Factor),

    #[error("trigger {0} is not an enabled factor")]
    UnknownTrigger(Factor),
}
