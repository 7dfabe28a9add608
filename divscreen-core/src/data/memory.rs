//! In-memory provider over preloaded data.
//!
//! Serves a fixed snapshot: bars and fundamentals are registered up front and
//! symbols without an entry are reported as not found. Useful when the caller
//! already holds the data, and for tests.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::provider::{DataError, DataSource, FundamentalsProvider, PriceProvider};
use crate::domain::Bar;
use crate::fundamentals::RawFundamentals;

#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    bars: HashMap<String, Vec<Bar>>,
    fundamentals: HashMap<String, RawFundamentals>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.into(), bars);
        self
    }

    pub fn with_fundamentals(mut self, fundamentals: RawFundamentals) -> Self {
        self.fundamentals
            .insert(fundamentals.symbol.clone(), fundamentals);
        self
    }
}

impl PriceProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn source(&self) -> DataSource {
        DataSource::Static
    }

    fn fetch_prices(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, DataError> {
        let bars = self.bars.get(symbol).ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect())
    }
}

impl FundamentalsProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<RawFundamentals, DataError> {
        self.fundamentals
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fundamentals::DIVIDEND_YIELD;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            symbol: "KO".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1,
        }
    }

    #[test]
    fn prices_are_clipped_to_range() {
        let p = StaticProvider::new().with_bars("KO", vec![bar(2, 1.0), bar(3, 2.0), bar(4, 3.0)]);
        let got = p
            .fetch_prices(
                "KO",
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            )
            .unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].close, 2.0);
    }

    #[test]
    fn unknown_symbols_are_not_found() {
        let p = StaticProvider::new().with_fundamentals(RawFundamentals::new("KO").with(DIVIDEND_YIELD, 0.03));
        assert!(p.fetch_fundamentals("KO").is_ok());
        assert!(matches!(
            p.fetch_fundamentals("PEP"),
            Err(DataError::SymbolNotFound { .. })
        ));
    }
}
