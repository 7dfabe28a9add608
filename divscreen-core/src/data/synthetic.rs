//! Synthetic provider for offline runs and demos.
//!
//! Prices are a random walk from 100.0 and fundamentals are drawn from
//! plausible ranges. Everything is seeded from the symbol name, so the same
//! symbol always gets the same data. These are clearly fake and tagged as
//! synthetic.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, DataSource, FundamentalsProvider, PriceProvider};
use crate::domain::Bar;
use crate::fundamentals::{RawFundamentals, DIVIDEND_YIELD, MARKET_CAP, PAYOUT_RATIO};

#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }

    fn rng_for(symbol: &str, stream: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(stream.as_bytes());
        hasher.update(b":");
        hasher.update(symbol.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }
}

/// Weekday random walk between `start` and `end` inclusive.
pub fn synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    let mut rng = SyntheticProvider::rng_for(symbol, "prices");
    let mut bars = Vec::new();
    let mut price = 100.0_f64;

    for current in start.iter_days().take_while(|d| *d <= end) {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            symbol: symbol.to_string(),
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
    }

    bars
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch_prices(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, DataError> {
        Ok(synthetic_bars(symbol, start, end))
    }
}

impl FundamentalsProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<RawFundamentals, DataError> {
        let mut rng = Self::rng_for(symbol, "fundamentals");
        // Roughly one symbol in five pays no dividend and reports no payout
        let pays = rng.gen_bool(0.8);
        let mut bag = RawFundamentals::new(symbol).with(MARKET_CAP, rng.gen_range(1e9..5e11));
        if pays {
            bag = bag
                .with(DIVIDEND_YIELD, rng.gen_range(0.005..0.07))
                .with(PAYOUT_RATIO, rng.gen_range(0.2..0.9));
        }
        Ok(bag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn synthetic_bars_are_deterministic() {
        let a = synthetic_bars("KO", d(2024, 1, 1), d(2024, 3, 1));
        let b = synthetic_bars("KO", d(2024, 1, 1), d(2024, 3, 1));
        assert_eq!(a, b);
        let c = synthetic_bars("PEP", d(2024, 1, 1), d(2024, 3, 1));
        assert_ne!(a[5].close, c[5].close);
    }

    #[test]
    fn synthetic_bars_skip_weekends_and_stay_in_range() {
        let bars = synthetic_bars("KO", d(2024, 1, 1), d(2024, 1, 31));
        // January 2024 has 23 weekdays
        assert_eq!(bars.len(), 23);
        assert!(bars
            .iter()
            .all(|b| b.low <= b.open.min(b.close) && b.high >= b.open.max(b.close) && b.close > 0.0));
        assert_eq!(crate::domain::first_unordered(&bars), None);
    }

    #[test]
    fn synthetic_fundamentals_are_deterministic_and_in_range() {
        let p = SyntheticProvider::new();
        let a = p.fetch_fundamentals("JNJ").unwrap();
        let b = p.fetch_fundamentals("JNJ").unwrap();
        assert_eq!(a, b);
        let cap = a.get(MARKET_CAP).unwrap();
        assert!((1e9..5e11).contains(&cap));
    }

    #[test]
    fn empty_range_gives_no_bars() {
        assert!(synthetic_bars("KO", d(2024, 2, 1), d(2024, 1, 1)).is_empty());
    }
}
