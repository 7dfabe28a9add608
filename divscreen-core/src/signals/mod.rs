//! Signal extraction: reduces an indicator series to latest-bar flags.
//!
//! Only the most recent bar is read. Undefined indicator values (NaN) never
//! raise a flag, and an empty series reads as "no signal".

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::fundamentals::FundamentalAttributes;
use crate::indicators::IndicatorSeries;

/// Thresholds for the latest-bar flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Oscillator strictly below this value is oversold.
    pub oversold_below: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            oversold_below: 30.0,
        }
    }
}

/// Technical flags for the most recent bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TechnicalSignals {
    pub is_oversold: bool,
    pub is_below_lower_band: bool,
    pub last_close: Option<f64>,
    pub last_oscillator: Option<f64>,
    pub last_lower_band: Option<f64>,
}

/// Read the latest-bar flags from `series`, which must be computed from `bars`.
pub fn extract(bars: &[Bar], series: &IndicatorSeries, config: &SignalConfig) -> TechnicalSignals {
    let (Some(bar), Some(point)) = (bars.last(), series.last()) else {
        return TechnicalSignals::default();
    };

    let close = defined(bar.close);
    let oscillator = defined(point.oscillator);
    let lower = defined(point.lower);

    TechnicalSignals {
        is_oversold: oscillator.is_some_and(|v| v < config.oversold_below),
        is_below_lower_band: matches!((close, lower), (Some(c), Some(l)) if c < l),
        last_close: close,
        last_oscillator: oscillator,
        last_lower_band: lower,
    }
}

fn defined(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

/// Everything the scorer needs about one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSignal {
    pub symbol: String,
    pub fundamentals: FundamentalAttributes,
    pub is_oversold: bool,
    pub is_below_lower_band: bool,
}

impl SymbolSignal {
    pub fn new(fundamentals: FundamentalAttributes, technical: &TechnicalSignals) -> Self {
        Self {
            symbol: fundamentals.symbol.clone(),
            fundamentals,
            is_oversold: technical.is_oversold,
            is_below_lower_band: technical.is_below_lower_band,
        }
    }
}
