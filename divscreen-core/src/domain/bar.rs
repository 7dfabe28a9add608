//! Bar: one day of market data for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for a single symbol.
///
/// Prices are dividend/split adjusted by the provider that produced them.
/// Fields the provider could not supply are `f64::NAN`; indicator windows
/// containing such a bar are undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }
}

/// Check that bars are strictly ascending by date (no duplicates).
///
/// Returns the index of the first bar that breaks the ordering.
pub fn first_unordered(bars: &[Bar]) -> Option<usize> {
    bars.windows(2)
        .position(|w| w[1].date <= w[0].date)
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            symbol: "KO".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 60.0,
            high: 61.5,
            low: 59.4,
            close: 61.0,
            volume: 12_000_000,
        }
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert!(!sample_bar().is_void());
    }

    #[test]
    fn ordering_check_flags_duplicate_dates() {
        let a = sample_bar();
        let mut b = sample_bar();
        b.date = a.date.succ_opt().unwrap();
        let c = b.clone();
        assert_eq!(first_unordered(&[a.clone(), b.clone()]), None);
        assert_eq!(first_unordered(&[a, b, c]), Some(2));
    }
}
