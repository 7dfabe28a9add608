//! Provider traits and structured error types.
//!
//! Price history and fundamentals come from independent providers so either
//! can be swapped or mocked. The screen pipeline only sees these traits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;
use crate::fundamentals::RawFundamentals;

/// Structured error types for data operations.
///
/// Every variant means "this symbol's data is unavailable"; the screen
/// records it and moves on.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no price history for {symbol}")]
    EmptyHistory { symbol: String },

    #[error("price history for {symbol} is not strictly ascending by date at bar {index}")]
    UnorderedHistory { symbol: String, index: usize },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("data error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    Synthetic,
    Static,
}

/// Daily price history provider.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    /// Fetch daily bars for `symbol` between `start` and `end` inclusive,
    /// ascending by date.
    fn fetch_prices(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<Bar>, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

/// Fundamentals provider. Any attribute may be absent from the bag.
pub trait FundamentalsProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_fundamentals(&self, symbol: &str) -> Result<RawFundamentals, DataError>;

    fn is_available(&self) -> bool {
        true
    }
}
