//! Scoring engine — one bar in, one `EvaluationResult` out.
//!
//! Each call to [`Engine::process`] runs the per-bar pipeline to completion:
//!
//! 1. Append: validate and store the bar (a rejected bar changes nothing)
//! 2. Refresh: update every registered rolling aggregate
//! 3. Detect: run the enabled detectors that have enough history
//! 4. Band: advance the trend band tracker
//! 5. Score: combine raw factor scores into the composite
//! 6. Decide: count confluence and apply the signal gates once warm
//!
//! An engine exclusively owns its history, aggregates and band state. Separate
//! engines share nothing and may run on separate threads.

pub mod warmup;

pub use warmup::WarmupState;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::band::{TrendBandState, TrendBandTracker, TrendDirection};
use crate::config::EngineConfig;
use crate::detectors::{build_detectors, Detector, DetectorOutput};
use crate::domain::{Bar, Factor, Signal};
use crate::error::{ConfigError, EngineError};
use crate::indicators::BarField;
use crate::presets::Preset;
use crate::scoring::{CompositeScore, CompositeScorer, SCORE_LIMIT};
use crate::series::BarSeries;
use crate::signal::{Confluence, SignalGenerator, SignalInputs};
use crate::stats::{RollingStatistics, StatKey};

/// Everything the engine reports for one accepted bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Logical index of the bar, starting at 0.
    pub index: usize,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub composite: CompositeScore,
    /// Raw detector outputs in configuration order.
    pub detectors: Vec<DetectorOutput>,
    pub band_value: f64,
    pub band_direction: TrendDirection,
    pub volume_ratio: f64,
    pub confluence: Confluence,
    pub warm: bool,
    pub signal: Signal,
}

impl EvaluationResult {
    /// Raw score of a detector factor, 0 when it is not enabled.
    pub fn detector_score(&self, factor: Factor) -> f64 {
        self.detectors
            .iter()
            .find(|d| d.factor == factor)
            .map_or(0.0, |d| d.score)
    }
}

pub struct Engine {
    config: EngineConfig,
    series: BarSeries,
    stats: RollingStatistics,
    detectors: Vec<Box<dyn Detector>>,
    band: TrendBandTracker,
    scorer: CompositeScorer,
    signals: SignalGenerator,
    warmup: WarmupState,
}

impl Engine {
    /// Validate `config` and build an engine with empty history.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        if let Err(err) = config.validate() {
            warn!(%err, "rejected engine configuration");
            return Err(err);
        }

        let detectors = build_detectors(&config.detectors);
        let band = TrendBandTracker::new(config.band.clone());

        let mut keys: BTreeSet<StatKey> = detectors
            .iter()
            .flat_map(|d| d.required_stats())
            .collect();
        keys.extend(band.required_stats());
        keys.insert(StatKey::mean(BarField::Volume, config.signal.volume_period));
        if config.ema.enabled {
            let ema = &config.ema;
            for period in [ema.fast, ema.medium, ema.slow] {
                keys.insert(StatKey::ema(BarField::Close, period));
            }
        }

        let history = detectors
            .iter()
            .map(|d| d.warmup_bars())
            .max()
            .unwrap_or(1);
        let warmup = WarmupState::from_lookbacks(
            detectors
                .iter()
                .map(|d| d.warmup_bars())
                .chain([band.warmup_bars(), config.signal.volume_period])
                .chain(config.ema.enabled.then(|| config.ema.longest())),
        );

        Ok(Self {
            series: BarSeries::with_capacity(history + config.history_margin),
            stats: RollingStatistics::new(keys),
            scorer: CompositeScorer::new(config.weights.clone()),
            signals: SignalGenerator::new(config.signal.clone(), config.weights.clone()),
            detectors,
            band,
            warmup,
            config,
        })
    }

    pub fn from_preset(preset: Preset) -> Result<Self, ConfigError> {
        Self::new(preset.config())
    }

    /// Process one bar.
    ///
    /// A malformed bar is rejected with [`EngineError::InvalidBar`] before
    /// any state changes; the next bar receives the same index.
    pub fn process(&mut self, bar: Bar) -> Result<EvaluationResult, EngineError> {
        let index = match self.series.append(bar) {
            Ok(index) => index,
            Err(err) => {
                warn!(%err, "bar rejected");
                return Err(err);
            }
        };
        self.stats.refresh(&bar);
        if self.warmup.process_bar() {
            debug!(index, warmup_bars = self.warmup.warmup_bars(), "engine warm");
        }

        let available = self.series.len();
        let detectors: Vec<DetectorOutput> = self
            .detectors
            .iter()
            .map(|d| {
                if available < d.warmup_bars() {
                    DetectorOutput::neutral(d.factor())
                } else {
                    d.evaluate(&self.series, &self.stats).sanitized()
                }
            })
            .collect();
        let mut raw: BTreeMap<Factor, f64> =
            detectors.iter().map(|d| (d.factor, d.score)).collect();

        let ema_alignment = self.ema_alignment(available);
        if self.config.ema.enabled {
            raw.insert(Factor::EmaAlignment, ema_alignment * SCORE_LIMIT);
        }

        let state = self.band.advance(&bar, &self.stats);
        let band_direction = self.band.direction();
        raw.insert(Factor::TrendBand, band_direction.sign() * SCORE_LIMIT);

        let confluence = self.signals.confluence(&raw);
        raw.insert(Factor::Confluence, confluence.net() as f64);
        let composite = self.scorer.combine(&raw);
        let volume_ratio = self
            .stats
            .volume_ratio(bar.volume, self.config.signal.volume_period);

        let warm = self.warmup.is_warm();
        let signal = if warm {
            let inputs = SignalInputs {
                raw: &raw,
                composite: &composite,
                band_direction,
                band_state: state,
                ema_alignment,
                volume_ratio,
            };
            self.signals.decide(&inputs, confluence)
        } else {
            Signal::none()
        };
        if !signal.is_none() {
            debug!(
                index,
                direction = ?signal.direction,
                strength = signal.strength,
                buy_votes = confluence.buy,
                sell_votes = confluence.sell,
                "signal"
            );
        }

        Ok(EvaluationResult {
            index,
            date: bar.date,
            composite,
            detectors,
            band_value: state.current,
            band_direction,
            volume_ratio,
            confluence,
            warm,
            signal,
        })
    }

    /// Process bars in order, stopping at the first rejected bar.
    pub fn process_all(
        &mut self,
        bars: impl IntoIterator<Item = Bar>,
    ) -> Result<Vec<EvaluationResult>, EngineError> {
        bars.into_iter().map(|bar| self.process(bar)).collect()
    }

    /// EMA stack alignment, 0 until the slowest EMA has a full period.
    fn ema_alignment(&self, available: usize) -> f64 {
        let ema = &self.config.ema;
        if ema.enabled && available >= ema.longest() {
            self.stats.ema_alignment(ema.fast, ema.medium, ema.slow)
        } else {
            0.0
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of bars accepted so far.
    pub fn bars_processed(&self) -> usize {
        self.series.len()
    }

    pub fn is_warm(&self) -> bool {
        self.warmup.is_warm()
    }

    pub fn warmup(&self) -> &WarmupState {
        &self.warmup
    }

    pub fn band_state(&self) -> Option<TrendBandState> {
        self.band.state()
    }

    pub fn series(&self) -> &BarSeries {
        &self.series
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let factors: Vec<Factor> = self.detectors.iter().map(|d| d.factor()).collect();
        f.debug_struct("Engine")
            .field("bars_processed", &self.series.len())
            .field("detectors", &factors)
            .field("warmup", &self.warmup)
            .field("band", &self.band.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorsConfig;
    use crate::domain::BarError;
    use crate::test_support::{flat_bars, make_bars};

    #[test]
    fn history_is_bounded_by_longest_detector() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let longest = build_detectors(&EngineConfig::default().detectors)
            .iter()
            .map(|d| d.warmup_bars())
            .max()
            .unwrap();
        assert_eq!(engine.series().capacity(), longest + 8);
    }

    #[test]
    fn warmup_covers_slow_ema() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        assert_eq!(engine.warmup().warmup_bars(), 50);
    }

    #[test]
    fn rejected_bar_keeps_index() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine.process(Bar::new(100.0, 101.0, 99.0, 100.5, 10.0)).unwrap();
        let err = engine
            .process(Bar::new(100.0, 99.0, 101.0, 100.0, 10.0))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidBar {
                index: 1,
                reason: BarError::HighBelowLow { .. }
            }
        ));
        assert_eq!(engine.bars_processed(), 1);
        let next = engine.process(Bar::new(100.0, 101.0, 99.0, 100.2, 10.0)).unwrap();
        assert_eq!(next.index, 1);
    }

    #[test]
    fn detectors_are_neutral_before_their_warmup() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let closes: Vec<f64> = (0..5).map(|i| 100.0 + i as f64 * 3.0).collect();
        for result in engine.process_all(make_bars(&closes)).unwrap() {
            assert!(result.detectors.iter().all(|d| d.score == 0.0));
            assert!(!result.warm);
            assert!(result.signal.is_none());
        }
    }

    #[test]
    fn flat_bars_score_zero() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        for result in engine.process_all(flat_bars(60, 100.0, 1000.0)).unwrap() {
            assert_eq!(result.composite.value, 0.0);
            assert!(result.signal.is_none());
            assert_eq!(result.band_value, 100.0);
        }
        assert!(engine.is_warm());
    }

    #[test]
    fn engine_without_detectors_still_tracks_the_band() {
        let config = EngineConfig {
            ema: crate::config::EmaParams::disabled(),
            detectors: DetectorsConfig::none(),
            weights: BTreeMap::from([(
                Factor::TrendBand,
                crate::scoring::FactorWeight::new(100.0, 1.0, 0.0),
            )]),
            signal: crate::signal::SignalRules {
                triggers: Vec::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut engine = Engine::new(config).unwrap();
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let results = engine.process_all(make_bars(&closes)).unwrap();
        assert!(results.iter().all(|r| r.detectors.is_empty()));
        assert!(engine.band_state().is_some());
    }

    #[test]
    fn confluence_feeds_the_composite() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let closes: Vec<f64> = (0..80)
            .map(|i| 100.0 + i as f64 * 0.8 + (i as f64 * 0.7).sin() * 3.0)
            .collect();
        for result in engine.process_all(make_bars(&closes)).unwrap() {
            let expected = (result.confluence.net() as f64 / 0.5).clamp(-5.0, 5.0);
            assert_eq!(result.composite.contribution(Factor::Confluence), expected);
        }
    }

    #[test]
    fn volume_cluster_bins_survive_history_eviction() {
        let config = EngineConfig {
            ema: crate::config::EmaParams::disabled(),
            detectors: DetectorsConfig {
                volume_cluster: Some(crate::detectors::VolumeClusterParams::default()),
                ..DetectorsConfig::none()
            },
            weights: BTreeMap::from([
                (
                    Factor::VolumeCluster,
                    crate::scoring::FactorWeight::new(90.0, 10.0, 20.0),
                ),
                (
                    Factor::TrendBand,
                    crate::scoring::FactorWeight::new(10.0, 1.0, 0.0),
                ),
            ]),
            signal: crate::signal::SignalRules {
                triggers: Vec::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut engine = Engine::new(config).unwrap();
        let bars: Vec<Bar> = (0..80)
            .map(|i| {
                let c = if i % 2 == 0 { 199.4 } else { 199.9 };
                Bar::new(c - 0.4, c + 0.05, c - 0.5, c, 1000.0)
            })
            .collect();
        let results = engine.process_all(bars).unwrap();
        assert!(engine.series().retained() < 80);
        let scores: Vec<f64> = results[29..]
            .iter()
            .map(|r| r.detectors[0].score)
            .collect();
        assert!(scores[0] > 0.0);
        assert!(scores.iter().all(|&s| s == scores[0]));
    }
}
