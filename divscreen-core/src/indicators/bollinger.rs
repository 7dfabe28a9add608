//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(close, period)
//! - Upper: middle + mult * stddev(close, period)
//! - Lower: middle - mult * stddev(close, period)
//!
//! Population stddev (divide by N) unless built with `BandDeviation::Sample`.
//! Lookback: period - 1.

use serde::{Deserialize, Serialize};

use super::indicator::Indicator;
use super::sma::Sma;
use crate::domain::Bar;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

/// Divisor used for the rolling standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandDeviation {
    /// Divide by N.
    #[default]
    Population,
    /// Divide by N - 1. Undefined for a window of one.
    Sample,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    sma: Sma,
    multiplier: f64,
    deviation: BandDeviation,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let tag = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            sma: Sma::new(period),
            multiplier,
            deviation: BandDeviation::Population,
            band,
            name: format!("bollinger_{tag}_{period}_{multiplier}"),
        }
    }

    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Upper)
    }

    pub fn middle(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Middle)
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Lower)
    }

    pub fn with_deviation(mut self, deviation: BandDeviation) -> Self {
        self.deviation = deviation;
        self
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let middle = self.sma.compute(bars);
        if self.band == BollingerBand::Middle {
            return middle;
        }

        let mut result = vec![f64::NAN; bars.len()];
        let divisor = match self.deviation {
            BandDeviation::Population => self.period as f64,
            BandDeviation::Sample => (self.period - 1) as f64,
        };
        if divisor == 0.0 {
            return result;
        }

        for (i, &mean) in middle.iter().enumerate() {
            // NaN through warmup and for windows holding a void close
            if mean.is_nan() {
                continue;
            }
            let window = &bars[(i + 1 - self.period)..=i];
            let variance = window
                .iter()
                .map(|bar| {
                    let diff = bar.close - mean;
                    diff * diff
                })
                .sum::<f64>()
                / divisor;
            let width = self.multiplier * variance.sqrt();
            result[i] = if self.band == BollingerBand::Upper {
                mean + width
            } else {
                mean - width
            };
        }

        result
    }
}
