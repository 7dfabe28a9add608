//! Indicator engine: the per-bar series the screen reads.
//!
//! One call computes volatility bands and the momentum oscillator for a
//! symbol's full history. The resulting columns are aligned 1:1 with the
//! input bars and never change after construction.

use serde::{Deserialize, Serialize};

use super::bollinger::{BandDeviation, Bollinger};
use super::indicator::Indicator;
use super::rsi::Rsi;
use crate::domain::Bar;

/// Window parameters for the indicator engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Volatility band window (bars).
    pub band_window: usize,
    /// Standard deviation multiplier for the bands.
    pub band_multiplier: f64,
    pub band_deviation: BandDeviation,
    /// Momentum oscillator lookback (bar-to-bar changes).
    pub momentum_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            band_window: 20,
            band_multiplier: 2.0,
            band_deviation: BandDeviation::Population,
            momentum_period: 14,
        }
    }
}

impl IndicatorConfig {
    /// Bars needed before every column of the last bar is defined.
    pub fn required_bars(&self) -> usize {
        self.band_window.max(self.momentum_period + 1)
    }
}

/// Indicator values for one bar. Undefined values are NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
    pub oscillator: f64,
}

/// Indicator columns aligned with a bar series.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSeries {
    middle: Vec<f64>,
    upper: Vec<f64>,
    lower: Vec<f64>,
    oscillator: Vec<f64>,
}

impl IndicatorSeries {
    /// Compute all columns for `bars`. Empty input yields an empty series.
    pub fn compute(bars: &[Bar], config: &IndicatorConfig) -> Self {
        if bars.is_empty() {
            return Self::default();
        }

        let window = config.band_window;
        let mult = config.band_multiplier;
        let dev = config.band_deviation;

        Self {
            middle: Bollinger::middle(window, mult).with_deviation(dev).compute(bars),
            upper: Bollinger::upper(window, mult).with_deviation(dev).compute(bars),
            lower: Bollinger::lower(window, mult).with_deviation(dev).compute(bars),
            oscillator: Rsi::new(config.momentum_period).compute(bars),
        }
    }

    pub fn len(&self) -> usize {
        self.middle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middle.is_empty()
    }

    /// Values at a bar index, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<IndicatorPoint> {
        if index >= self.len() {
            return None;
        }
        Some(IndicatorPoint {
            middle: self.middle[index],
            upper: self.upper[index],
            lower: self.lower[index],
            oscillator: self.oscillator[index],
        })
    }

    /// Values at the most recent bar.
    pub fn last(&self) -> Option<IndicatorPoint> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn middle(&self) -> &[f64] {
        &self.middle
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn oscillator(&self) -> &[f64] {
        &self.oscillator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn empty_bars_give_empty_series() {
        let series = IndicatorSeries::compute(&[], &IndicatorConfig::default());
        assert!(series.is_empty());
        assert!(series.last().is_none());
    }

    #[test]
    fn columns_align_with_bars() {
        let bars = make_bars(&ramp(30));
        let series = IndicatorSeries::compute(&bars, &IndicatorConfig::default());
        assert_eq!(series.len(), 30);
        assert_eq!(series.upper().len(), 30);
        assert_eq!(series.oscillator().len(), 30);
    }

    #[test]
    fn warmup_boundaries() {
        let bars = make_bars(&ramp(30));
        let series = IndicatorSeries::compute(&bars, &IndicatorConfig::default());

        // bands undefined for the first 19 bars, oscillator for the first 14
        assert!(series.get(18).unwrap().lower.is_nan());
        assert!(!series.get(19).unwrap().lower.is_nan());
        assert!(series.get(13).unwrap().oscillator.is_nan());
        assert!(!series.get(14).unwrap().oscillator.is_nan());
    }

    #[test]
    fn short_series_has_undefined_bands() {
        let bars = make_bars(&ramp(10));
        let series = IndicatorSeries::compute(&bars, &IndicatorConfig::default());
        assert!(series.lower().iter().all(|v| v.is_nan()));
        assert!(series.upper().iter().all(|v| v.is_nan()));
        assert!(series.middle().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rising_series_reads_overbought() {
        let bars = make_bars(&ramp(30));
        let series = IndicatorSeries::compute(&bars, &IndicatorConfig::default());
        assert_approx(series.last().unwrap().oscillator, 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn required_bars_is_longest_window() {
        let config = IndicatorConfig::default();
        assert_eq!(config.required_bars(), 20);
        let config = IndicatorConfig {
            momentum_period: 30,
            ..IndicatorConfig::default()
        };
        assert_eq!(config.required_bars(), 31);
    }
}
