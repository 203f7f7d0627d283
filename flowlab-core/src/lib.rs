//! FlowLab Core — streaming multi-factor signal scoring.
//!
//! This crate contains the whole scoring engine:
//! - Domain types (bars, factors, signals)
//! - Append-only bar history over a bounded ring buffer
//! - Streaming indicators and the rolling statistics registry
//! - Pattern detectors (absorption, liquidity, order blocks, fair-value gaps,
//!   structure, divergence, volume clusters, delta, VWAP deviation)
//! - Adaptive trend band tracker
//! - Composite scorer and confluence signal generator
//! - Configuration, named presets and a host plot adapter

pub mod adapter;
pub mod band;
pub mod config;
pub mod detectors;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod presets;
pub mod scoring;
pub mod series;
pub mod signal;
pub mod stats;
pub mod synthetic;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapter::{PlotAdapter, PlotFrame};
pub use config::EngineConfig;
pub use domain::{Bar, BarError, Direction, Factor, Signal};
pub use engine::{Engine, EvaluationResult};
pub use error::{ConfigError, EngineError};
pub use presets::Preset;
