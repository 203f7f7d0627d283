//! Signal generator — confluence and gating rules on top of the composite score.
//!
//! A buy fires only when all of these hold on the same bar: enough factors
//! vote bullish, the trend gate agrees, volume is above its threshold, a
//! trigger factor is bullish, and the composite itself is positive. Sells
//! mirror this. Because the composite can only have one sign, at most one
//! direction can pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::band::{TrendBandState, TrendDirection};
use crate::domain::{Factor, Signal};
use crate::error::ConfigError;
use crate::scoring::{CompositeScore, FactorWeight};

/// Which trend input must agree with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendGate {
    #[default]
    Band,
    EmaAlignment,
    Either,
    Both,
    /// Close on the signal side of the band, and the line flipped toward the
    /// signal on the bar before.
    BandFlip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalRules {
    pub min_confluence: usize,
    pub volume_period: usize,
    pub volume_ratio_threshold: f64,
    pub trend_gate: TrendGate,
    /// At least one of these must point the same way as the signal.
    pub triggers: Vec<Factor>,
}

impl Default for SignalRules {
    fn default() -> Self {
        Self {
            min_confluence: 3,
            volume_period: 14,
            volume_ratio_threshold: 1.5,
            trend_gate: TrendGate::Band,
            triggers: vec![
                Factor::LiquiditySweep,
                Factor::OrderBlock,
                Factor::StructureBreak,
            ],
        }
    }
}

impl SignalRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_confluence == 0 {
            return Err(ConfigError::ZeroPeriod { name: "signal.min_confluence" });
        }
        if self.volume_period == 0 {
            return Err(ConfigError::ZeroPeriod { name: "signal.volume_period" });
        }
        if !(self.volume_ratio_threshold >= 0.0) {
            return Err(ConfigError::NonPositive {
                name: "signal.volume_ratio_threshold",
                value: self.volume_ratio_threshold,
            });
        }
        Ok(())
    }
}

/// Number of factors voting each way on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Confluence {
    pub buy: usize,
    pub sell: usize,
}

impl Confluence {
    pub fn net(&self) -> i64 {
        self.buy as i64 - self.sell as i64
    }
}

/// Everything the generator reads for one bar.
#[derive(Debug, Clone, Copy)]
pub struct SignalInputs<'a> {
    pub raw: &'a BTreeMap<Factor, f64>,
    pub composite: &'a CompositeScore,
    pub band_direction: TrendDirection,
    pub band_state: TrendBandState,
    /// +1, -1 or 0 from the EMA stack.
    pub ema_alignment: f64,
    pub volume_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    rules: SignalRules,
    weights: BTreeMap<Factor, FactorWeight>,
}

impl SignalGenerator {
    pub fn new(rules: SignalRules, weights: BTreeMap<Factor, FactorWeight>) -> Self {
        Self { rules, weights }
    }

    pub fn rules(&self) -> &SignalRules {
        &self.rules
    }

    /// Votes from every weighted factor except the trend band, which gates
    /// instead of voting, and confluence itself.
    pub fn confluence(&self, raw: &BTreeMap<Factor, f64>) -> Confluence {
        let mut votes = Confluence::default();
        for (factor, weight) in &self.weights {
            if matches!(factor, Factor::TrendBand | Factor::Confluence) {
                continue;
            }
            let score = raw.get(factor).copied().unwrap_or(0.0);
            if score.abs() <= weight.confluence_floor {
                continue;
            }
            if score > 0.0 {
                votes.buy += 1;
            } else if score < 0.0 {
                votes.sell += 1;
            }
        }
        votes
    }

    fn trend_agrees(&self, inputs: &SignalInputs<'_>, sign: f64) -> bool {
        let band = inputs.band_direction.sign() == sign;
        let ema = inputs.ema_alignment == sign;
        match self.rules.trend_gate {
            TrendGate::Band => band,
            TrendGate::EmaAlignment => ema,
            TrendGate::Either => band || ema,
            TrendGate::Both => band && ema,
            TrendGate::BandFlip => {
                let fresh = if sign > 0.0 {
                    inputs.band_state.flipped_up_previously()
                } else {
                    inputs.band_state.flipped_down_previously()
                };
                band && fresh
            }
        }
    }

    fn triggered(&self, raw: &BTreeMap<Factor, f64>, sign: f64) -> bool {
        self.rules
            .triggers
            .iter()
            .filter_map(|f| raw.get(f))
            .any(|&score| score * sign > 0.0)
    }

    fn passes(&self, inputs: &SignalInputs<'_>, votes: usize, sign: f64) -> bool {
        inputs.composite.value * sign > 0.0
            && votes >= self.rules.min_confluence
            && self.trend_agrees(inputs, sign)
            && inputs.volume_ratio > self.rules.volume_ratio_threshold
            && self.triggered(inputs.raw, sign)
    }

    /// Decide the bar's signal from its inputs and confluence.
    pub fn decide(&self, inputs: &SignalInputs<'_>, confluence: Confluence) -> Signal {
        if self.passes(inputs, confluence.buy, 1.0) {
            Signal::buy(inputs.composite.value)
        } else if self.passes(inputs, confluence.sell, -1.0) {
            Signal::sell(inputs.composite.value)
        } else {
            Signal::none()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    fn weights() -> BTreeMap<Factor, FactorWeight> {
        BTreeMap::from([
            (Factor::Absorption, FactorWeight::new(25.0, 6.0, 5.0)),
            (Factor::Delta, FactorWeight::new(25.0, 5000.0, 100.0)),
            (Factor::StructureBreak, FactorWeight::new(25.0, 4.0, 0.0)),
            (Factor::TrendBand, FactorWeight::new(25.0, 1.0, 0.0)),
        ])
    }

    fn generator() -> SignalGenerator {
        SignalGenerator::new(SignalRules::default(), weights())
    }

    fn bullish_raw() -> BTreeMap<Factor, f64> {
        BTreeMap::from([
            (Factor::Absorption, 30.0),
            (Factor::Delta, 800.0),
            (Factor::StructureBreak, 50.0),
            (Factor::TrendBand, 100.0),
        ])
    }

    /// Line at 95 after dropping from 99 on the previous bar.
    fn dropped_line() -> TrendBandState {
        TrendBandState {
            current: 95.0,
            previous: 95.0,
            before_previous: 99.0,
        }
    }

    fn inputs<'a>(raw: &'a BTreeMap<Factor, f64>, composite: &'a CompositeScore) -> SignalInputs<'a> {
        SignalInputs {
            raw,
            composite,
            band_direction: TrendDirection::Up,
            band_state: dropped_line(),
            ema_alignment: 1.0,
            volume_ratio: 2.0,
        }
    }

    #[test]
    fn confluence_respects_floors_and_skips_band() {
        let mut raw = bullish_raw();
        raw.insert(Factor::Delta, -50.0); // below its floor of 100
        let votes = generator().confluence(&raw);
        assert_eq!(votes, Confluence { buy: 2, sell: 0 });
        assert_eq!(votes.net(), 2);
    }

    #[test]
    fn confluence_factor_does_not_vote_for_itself() {
        let mut w = weights();
        w.insert(Factor::Confluence, FactorWeight::new(5.0, 0.5, 0.0));
        let g = SignalGenerator::new(SignalRules::default(), w);
        let mut raw = bullish_raw();
        raw.insert(Factor::Confluence, 3.0);
        assert_eq!(g.confluence(&raw), Confluence { buy: 3, sell: 0 });
    }

    #[test]
    fn buy_fires_when_every_gate_passes() {
        let raw = bullish_raw();
        let composite = CompositeScore {
            value: 60.0,
            breakdown: BTreeMap::new(),
        };
        let g = generator();
        let signal = g.decide(&inputs(&raw, &composite), g.confluence(&raw));
        assert_eq!(signal.direction, Direction::Buy);
        assert_eq!(signal.strength, 60.0);
    }

    #[test]
    fn each_gate_can_block() {
        let raw = bullish_raw();
        let composite = CompositeScore {
            value: 60.0,
            breakdown: BTreeMap::new(),
        };
        let g = generator();
        let votes = g.confluence(&raw);

        let mut quiet = inputs(&raw, &composite);
        quiet.volume_ratio = 1.0;
        assert!(g.decide(&quiet, votes).is_none());

        let mut against = inputs(&raw, &composite);
        against.band_direction = TrendDirection::Down;
        assert!(g.decide(&against, votes).is_none());

        let mut no_trigger = raw.clone();
        no_trigger.insert(Factor::StructureBreak, 0.0);
        let votes = g.confluence(&no_trigger);
        assert!(g.decide(&inputs(&no_trigger, &composite), votes).is_none());
    }

    #[test]
    fn sell_strength_is_magnitude() {
        let raw: BTreeMap<Factor, f64> = bullish_raw().into_iter().map(|(f, s)| (f, -s)).collect();
        let composite = CompositeScore {
            value: -45.0,
            breakdown: BTreeMap::new(),
        };
        let g = generator();
        let mut bearish = inputs(&raw, &composite);
        bearish.band_direction = TrendDirection::Down;
        let signal = g.decide(&bearish, g.confluence(&raw));
        assert_eq!(signal.direction, Direction::Sell);
        assert_eq!(signal.strength, 45.0);
    }

    #[test]
    fn composite_sign_must_agree() {
        let raw = bullish_raw();
        let composite = CompositeScore {
            value: -5.0,
            breakdown: BTreeMap::new(),
        };
        let g = generator();
        assert!(g.decide(&inputs(&raw, &composite), g.confluence(&raw)).is_none());
    }

    #[test]
    fn trend_gate_variants() {
        let raw = bullish_raw();
        let composite = CompositeScore {
            value: 60.0,
            breakdown: BTreeMap::new(),
        };
        let mut mixed = inputs(&raw, &composite);
        mixed.ema_alignment = 0.0;
        for (gate, fires) in [
            (TrendGate::Band, true),
            (TrendGate::EmaAlignment, false),
            (TrendGate::Either, true),
            (TrendGate::Both, false),
        ] {
            let rules = SignalRules {
                trend_gate: gate,
                ..Default::default()
            };
            let g = SignalGenerator::new(rules, weights());
            let signal = g.decide(&mixed, g.confluence(&raw));
            assert_eq!(!signal.is_none(), fires, "gate {gate:?}");
        }
    }

    #[test]
    fn band_flip_gate_needs_a_prior_bar_flip() {
        let raw = bullish_raw();
        let composite = CompositeScore {
            value: 60.0,
            breakdown: BTreeMap::new(),
        };
        let g = SignalGenerator::new(
            SignalRules {
                trend_gate: TrendGate::BandFlip,
                ..Default::default()
            },
            weights(),
        );
        let votes = g.confluence(&raw);

        let fresh = inputs(&raw, &composite);
        assert_eq!(g.decide(&fresh, votes).direction, Direction::Buy);

        let mut held = inputs(&raw, &composite);
        held.band_state = TrendBandState {
            current: 95.0,
            previous: 95.0,
            before_previous: 95.0,
        };
        assert!(g.decide(&held, votes).is_none());

        let mut below = inputs(&raw, &composite);
        below.band_direction = TrendDirection::Down;
        assert!(g.decide(&below, votes).is_none());
    }

    #[test]
    fn band_flip_gate_sells_after_line_jumps_up() {
        let raw: BTreeMap<Factor, f64> = bullish_raw().into_iter().map(|(f, s)| (f, -s)).collect();
        let composite = CompositeScore {
            value: -40.0,
            breakdown: BTreeMap::new(),
        };
        let g = SignalGenerator::new(
            SignalRules {
                trend_gate: TrendGate::BandFlip,
                ..Default::default()
            },
            weights(),
        );
        let mut bearish = inputs(&raw, &composite);
        bearish.band_direction = TrendDirection::Down;
        // A line that dropped reads as support, not resistance.
        assert!(g.decide(&bearish, g.confluence(&raw)).is_none());

        bearish.band_state = TrendBandState {
            current: 105.0,
            previous: 105.0,
            before_previous: 101.0,
        };
        let signal = g.decide(&bearish, g.confluence(&raw));
        assert_eq!(signal.direction, Direction::Sell);
        assert_eq!(signal.strength, 40.0);
    }
}
