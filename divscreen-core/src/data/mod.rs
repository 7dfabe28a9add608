//! Market data: provider traits, concrete providers, and universes.

pub mod circuit_breaker;
pub mod memory;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use memory::StaticProvider;
pub use provider::{DataError, DataSource, FundamentalsProvider, PriceProvider};
pub use synthetic::{synthetic_bars, SyntheticProvider};
pub use universe::{dedup_symbols, normalize_symbol, Universe, UniverseCache, UniverseError, UniverseFormat};
pub use yahoo::YahooProvider;
