//! Host adapter — turns bar callbacks into plot values.
//!
//! The adapter does no scoring of its own. It forwards each bar to the engine
//! and maps the result onto the five lines a charting host draws.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Bar, Direction};
use crate::engine::{Engine, EvaluationResult};

/// Values for one bar on the host's plots.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotFrame {
    /// Buy strength, 0 when no buy fired.
    pub buy: f64,
    /// Negated sell strength, 0 when no sell fired.
    pub sell: f64,
    pub score: f64,
    pub band: f64,
    /// Buy votes minus sell votes.
    pub confluence: i64,
}

impl From<&EvaluationResult> for PlotFrame {
    fn from(result: &EvaluationResult) -> Self {
        let (buy, sell) = match result.signal.direction {
            Direction::Buy => (result.signal.strength, 0.0),
            Direction::Sell => (0.0, -result.signal.strength),
            Direction::None => (0.0, 0.0),
        };
        Self {
            buy,
            sell,
            score: result.composite.value,
            band: result.band_value,
            confluence: result.confluence.net(),
        }
    }
}

#[derive(Debug)]
pub struct PlotAdapter {
    engine: Engine,
    last_band: f64,
}

impl PlotAdapter {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            last_band: 0.0,
        }
    }

    /// Forward one host bar. A rejected bar yields a blank frame that keeps
    /// the previous band value so the line does not break.
    pub fn on_bar(&mut self, bar: Bar) -> PlotFrame {
        match self.engine.process(bar) {
            Ok(result) => {
                self.last_band = result.band_value;
                PlotFrame::from(&result)
            }
            Err(err) => {
                warn!(%err, "skipping bar");
                PlotFrame {
                    band: self.last_band,
                    ..PlotFrame::default()
                }
            }
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }
}
