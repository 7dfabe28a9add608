//! Fundamental attributes and their normalization.
//!
//! Providers hand back a loose key/value bag. Normalization turns every
//! missing, non-finite or negative value into 0 so downstream comparisons are
//! always well defined.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DIVIDEND_YIELD: &str = "dividendYield";
pub const PAYOUT_RATIO: &str = "payoutRatio";
pub const MARKET_CAP: &str = "marketCap";

/// Provider-supplied attribute bag for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFundamentals {
    pub symbol: String,
    pub values: BTreeMap<String, f64>,
}

impl RawFundamentals {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Insert a value only when the provider actually supplied one.
    pub fn insert_opt(&mut self, key: &str, value: Option<f64>) {
        if let Some(v) = value {
            self.values.insert(key.to_string(), v);
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

/// Sanitized fundamentals. Every field is finite and >= 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalAttributes {
    pub symbol: String,
    pub dividend_yield: f64,
    pub payout_ratio: f64,
    pub market_cap: f64,
}

impl FundamentalAttributes {
    pub fn normalize(raw: &RawFundamentals) -> Self {
        Self {
            symbol: raw.symbol.clone(),
            dividend_yield: sanitize(raw.get(DIVIDEND_YIELD)),
            payout_ratio: sanitize(raw.get(PAYOUT_RATIO)),
            market_cap: sanitize(raw.get(MARKET_CAP)),
        }
    }
}

fn sanitize(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}
