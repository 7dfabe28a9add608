//! Screen pipeline: fetch, compute and score a universe of symbols.
//!
//! Each symbol is evaluated on a private rayon pool. The pool task hands the
//! symbol's fetches and indicator compute to a helper thread and waits for it
//! with a timeout, so one hung provider call cannot stall the screen. A
//! symbol that times out is dropped and its helper thread left to finish on
//! its own. Helpers hold a slot in a gate sized to the pool, so abandoned
//! helpers never push the number of provider calls in flight past
//! `worker_count`; the wait for a slot counts against the symbol's budget.
//!
//! Per-symbol results are collected in universe order, then scored and
//! annotated on the calling thread.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use divscreen_core::data::{dedup_symbols, DataError, DataSource, FundamentalsProvider, PriceProvider};
use divscreen_core::domain::first_unordered;
use divscreen_core::fundamentals::FundamentalAttributes;
use divscreen_core::indicators::{IndicatorConfig, IndicatorSeries};
use divscreen_core::scoring::{rank, RiskTolerance};
use divscreen_core::signals::{extract, SignalConfig, SymbolSignal};
use divscreen_core::strategy::{annotate, ParseHorizonError, ScoredRow, TimeHorizon};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ScreenConfig};
use crate::gate::FetchGate;

/// Current schema version for persisted screen reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Invalid input to `screen`. Raised before any provider call.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("invalid configuration: universe is empty")]
    EmptyUniverse,

    #[error("invalid configuration: market cap floor must be a non-negative number, got {0}")]
    InvalidFloor(f64),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Horizon(#[from] ParseHorizonError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Why a symbol was dropped from the screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    #[error("price history unavailable: {reason}")]
    PriceUnavailable { reason: String },

    #[error("fundamentals unavailable: {reason}")]
    FundamentalsUnavailable { reason: String },

    #[error("timed out after {timeout_ms} ms")]
    TimedOut { timeout_ms: u64 },

    #[error("worker failed: {reason}")]
    WorkerFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub symbol: String,
    #[serde(flatten)]
    pub kind: FailureKind,
}

/// A symbol that participated but whose indicators are only partly defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolWarning {
    pub symbol: String,
    pub bars: usize,
    pub required_bars: usize,
}

impl SymbolWarning {
    pub fn message(&self) -> String {
        format!(
            "insufficient history: {} bars, {} needed for fully defined indicators",
            self.bars, self.required_bars
        )
    }
}

/// Result of one screen run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenReport {
    pub schema_version: u32,
    pub rows: Vec<ScoredRow>,
    /// Distinct symbols requested.
    pub universe_size: usize,
    /// Symbols that produced prices and fundamentals and entered scoring.
    pub scored_count: usize,
    pub failures: Vec<SymbolFailure>,
    pub warnings: Vec<SymbolWarning>,
    pub risk_tolerance: RiskTolerance,
    pub time_horizon: TimeHorizon,
    pub market_cap_floor: f64,
    pub as_of: NaiveDate,
    pub config_hash: String,
    /// Where the price history came from.
    pub price_source: DataSource,
}

impl ScreenReport {
    /// No symbol produced data, so the empty result says nothing about the filter.
    pub fn is_no_data(&self) -> bool {
        self.scored_count == 0
    }

    /// Data arrived but nothing passed the market-cap floor.
    pub fn is_no_match(&self) -> bool {
        self.scored_count > 0 && self.rows.is_empty()
    }
}

/// Outcome of evaluating one symbol.
pub type Evaluation = Result<(SymbolSignal, Option<SymbolWarning>), FailureKind>;

/// Runs screens against a pair of providers.
pub struct Screener {
    prices: Arc<dyn PriceProvider>,
    fundamentals: Arc<dyn FundamentalsProvider>,
    config: ScreenConfig,
    pool: rayon::ThreadPool,
    gate: Arc<FetchGate>,
}

impl Screener {
    /// Validate `config` and build the worker pool.
    pub fn new(
        prices: Arc<dyn PriceProvider>,
        fundamentals: Arc<dyn FundamentalsProvider>,
        config: ScreenConfig,
    ) -> Result<Self, ScreenError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.pool.worker_count())
            .thread_name(|i| format!("divscreen-worker-{i}"))
            .build()
            .map_err(|e| ScreenError::ThreadPool(e.to_string()))?;
        let gate = FetchGate::new(config.pool.worker_count());
        Ok(Self {
            prices,
            fundamentals,
            config,
            pool,
            gate,
        })
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Screen `universe` and return ranked, annotated rows.
    ///
    /// Symbols are trimmed, upper-cased and de-duplicated first. Per-symbol
    /// failures never fail the call; they are listed in the report.
    pub fn screen(
        &self,
        universe: &[String],
        market_cap_floor: f64,
        time_horizon: TimeHorizon,
    ) -> Result<ScreenReport, ScreenError> {
        let symbols = dedup_symbols(universe.iter().map(|s| s.as_str()));
        if symbols.is_empty() {
            return Err(ScreenError::EmptyUniverse);
        }
        if !market_cap_floor.is_finite() || market_cap_floor < 0.0 {
            return Err(ScreenError::InvalidFloor(market_cap_floor));
        }

        let today = chrono::Local::now().date_naive();
        let (start, end) = self.config.data.window(today);
        let started = Instant::now();

        info!(
            symbols = symbols.len(),
            workers = self.config.pool.worker_count(),
            prices = self.prices.name(),
            fundamentals = self.fundamentals.name(),
            %start,
            %end,
            "starting screen"
        );
        if !self.prices.is_available() || !self.fundamentals.is_available() {
            warn!("a data provider reports itself unavailable; symbols are likely to fail");
        }

        // Indexed parallel collect keeps universe order
        let outcomes: Vec<Evaluation> = self.pool.install(|| {
            symbols
                .par_iter()
                .map(|symbol| self.evaluate_with_timeout(symbol, start, end))
                .collect()
        });

        let mut signals = Vec::with_capacity(symbols.len());
        let mut failures = Vec::new();
        let mut warnings = Vec::new();
        for (symbol, outcome) in symbols.iter().zip(outcomes) {
            match outcome {
                Ok((signal, warning)) => {
                    if let Some(w) = warning {
                        warn!(symbol = %w.symbol, bars = w.bars, required = w.required_bars, "insufficient history");
                        warnings.push(w);
                    }
                    signals.push(signal);
                }
                Err(kind) => {
                    warn!(symbol = %symbol, error = %kind, "symbol dropped");
                    failures.push(SymbolFailure {
                        symbol: symbol.clone(),
                        kind,
                    });
                }
            }
        }

        let ranked = rank(&signals, market_cap_floor, &self.config.scoring);
        let rows = annotate(ranked, time_horizon);

        info!(
            universe = symbols.len(),
            scored = signals.len(),
            failed = failures.len(),
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "screen complete"
        );
        let abandoned = self.gate.in_flight();
        if abandoned > 0 {
            warn!(abandoned, "timed-out fetches are still running");
        }

        Ok(ScreenReport {
            schema_version: SCHEMA_VERSION,
            rows,
            universe_size: symbols.len(),
            scored_count: signals.len(),
            failures,
            warnings,
            risk_tolerance: self.config.scoring.risk_tolerance,
            time_horizon,
            market_cap_floor,
            as_of: end,
            config_hash: self.config.config_hash(),
            price_source: self.prices.source(),
        })
    }

    /// Like `screen`, with the horizon given as its string form.
    pub fn screen_with_horizon(
        &self,
        universe: &[String],
        market_cap_floor: f64,
        time_horizon: &str,
    ) -> Result<ScreenReport, ScreenError> {
        let horizon: TimeHorizon = time_horizon.parse()?;
        self.screen(universe, market_cap_floor, horizon)
    }

    fn evaluate_with_timeout(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Evaluation {
        let timeout = self.config.pool.symbol_timeout();
        let deadline = Instant::now() + timeout;
        let timed_out = || FailureKind::TimedOut {
            timeout_ms: timeout.as_millis() as u64,
        };

        // All slots may be held by helpers abandoned after earlier timeouts
        let Some(permit) = self.gate.acquire(timeout) else {
            debug!(symbol, "no fetch slot freed within the symbol budget");
            return Err(timed_out());
        };

        let (tx, rx) = mpsc::channel();
        let prices = Arc::clone(&self.prices);
        let fundamentals = Arc::clone(&self.fundamentals);
        let indicators = self.config.indicators.clone();
        let signal_config = self.config.signals.clone();
        let owned = symbol.to_string();

        let spawned = thread::Builder::new()
            .name(format!("divscreen-fetch-{symbol}"))
            .spawn(move || {
                let _permit = permit;
                let result = evaluate_symbol(
                    prices.as_ref(),
                    fundamentals.as_ref(),
                    &owned,
                    start,
                    end,
                    &indicators,
                    &signal_config,
                );
                // Receiver is gone after a timeout
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            return Err(FailureKind::WorkerFailed {
                reason: e.to_string(),
            });
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining.max(Duration::from_millis(1))) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(timed_out()),
            Err(RecvTimeoutError::Disconnected) => Err(FailureKind::WorkerFailed {
                reason: "worker exited without a result".into(),
            }),
        }
    }
}

/// Fetch both data sets for one symbol and reduce them to a signal.
pub fn evaluate_symbol(
    prices: &dyn PriceProvider,
    fundamentals: &dyn FundamentalsProvider,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    indicators: &IndicatorConfig,
    signal_config: &SignalConfig,
) -> Evaluation {
    let bars = prices
        .fetch_prices(symbol, start, end)
        .map_err(|e| FailureKind::PriceUnavailable {
            reason: e.to_string(),
        })?;
    if bars.is_empty() {
        return Err(FailureKind::PriceUnavailable {
            reason: DataError::EmptyHistory {
                symbol: symbol.to_string(),
            }
            .to_string(),
        });
    }
    if let Some(index) = first_unordered(&bars) {
        return Err(FailureKind::PriceUnavailable {
            reason: DataError::UnorderedHistory {
                symbol: symbol.to_string(),
                index,
            }
            .to_string(),
        });
    }

    let raw = fundamentals
        .fetch_fundamentals(symbol)
        .map_err(|e| FailureKind::FundamentalsUnavailable {
            reason: e.to_string(),
        })?;

    let series = IndicatorSeries::compute(&bars, indicators);
    let technical = extract(&bars, &series, signal_config);
    debug!(
        symbol,
        bars = bars.len(),
        void_bars = bars.iter().filter(|b| b.is_void()).count(),
        oscillator = ?technical.last_oscillator,
        oversold = technical.is_oversold,
        below_band = technical.is_below_lower_band,
        "symbol evaluated"
    );

    let required_bars = indicators.required_bars();
    let warning = (bars.len() < required_bars).then(|| SymbolWarning {
        symbol: symbol.to_string(),
        bars: bars.len(),
        required_bars,
    });

    let mut attributes = FundamentalAttributes::normalize(&raw);
    // Keyed by the requested symbol, whatever the provider echoed back
    attributes.symbol = symbol.to_string();
    Ok((SymbolSignal::new(attributes, &technical), warning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use divscreen_core::data::StaticProvider;
    use divscreen_core::domain::Bar;
    use divscreen_core::fundamentals::{RawFundamentals, DIVIDEND_YIELD, MARKET_CAP};

    fn bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                symbol: symbol.into(),
                date: base + chrono::Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1,
            })
            .collect()
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    #[test]
    fn evaluate_flags_short_history() {
        let p = StaticProvider::new()
            .with_bars("KO", bars("KO", &[10.0, 11.0, 12.0]))
            .with_fundamentals(RawFundamentals::new("KO").with(DIVIDEND_YIELD, 0.03).with(MARKET_CAP, 2e11));
        let (start, end) = window();
        let (signal, warning) = evaluate_symbol(
            &p,
            &p,
            "KO",
            start,
            end,
            &IndicatorConfig::default(),
            &SignalConfig::default(),
        )
        .unwrap();
        assert!(!signal.is_oversold);
        assert!(!signal.is_below_lower_band);
        let w = warning.unwrap();
        assert_eq!(w.bars, 3);
        assert_eq!(w.required_bars, 20);
    }

    #[test]
    fn evaluate_empty_history_is_unavailable() {
        let p = StaticProvider::new()
            .with_bars("KO", Vec::new())
            .with_fundamentals(RawFundamentals::new("KO"));
        let (start, end) = window();
        let err = evaluate_symbol(
            &p,
            &p,
            "KO",
            start,
            end,
            &IndicatorConfig::default(),
            &SignalConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FailureKind::PriceUnavailable { .. }));
    }

    #[test]
    fn evaluate_missing_fundamentals_is_unavailable() {
        let p = StaticProvider::new().with_bars("KO", bars("KO", &[1.0; 30]));
        let (start, end) = window();
        let err = evaluate_symbol(
            &p,
            &p,
            "KO",
            start,
            end,
            &IndicatorConfig::default(),
            &SignalConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FailureKind::FundamentalsUnavailable { .. }));
    }

    #[test]
    fn evaluate_rejects_unordered_history() {
        let mut reversed = bars("KO", &[10.0, 11.0, 12.0, 13.0]);
        reversed.reverse();
        let mut duplicated = bars("PEP", &[10.0, 11.0, 12.0]);
        duplicated[2].date = duplicated[1].date;
        let p = StaticProvider::new()
            .with_bars("KO", reversed)
            .with_bars("PEP", duplicated)
            .with_fundamentals(RawFundamentals::new("KO").with(MARKET_CAP, 2e11))
            .with_fundamentals(RawFundamentals::new("PEP").with(MARKET_CAP, 2e11));
        let (start, end) = window();

        for symbol in ["KO", "PEP"] {
            let err = evaluate_symbol(
                &p,
                &p,
                symbol,
                start,
                end,
                &IndicatorConfig::default(),
                &SignalConfig::default(),
            )
            .unwrap_err();
            match err {
                FailureKind::PriceUnavailable { reason } => {
                    assert!(reason.contains("not strictly ascending"), "{reason}")
                }
                other => panic!("expected PriceUnavailable, got {other:?}"),
            }
        }
    }

    #[test]
    fn new_rejects_invalid_config() {
        let p = Arc::new(StaticProvider::new());
        let mut config = ScreenConfig::default();
        config.indicators.band_window = 0;
        let result = Screener::new(p.clone(), p, config);
        assert!(matches!(result, Err(ScreenError::Config(_))));
    }

    #[test]
    fn failure_serializes_with_kind_tag() {
        let f = SymbolFailure {
            symbol: "KO".into(),
            kind: FailureKind::TimedOut { timeout_ms: 5000 },
        };
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["symbol"], "KO");
        assert_eq!(json["kind"], "timed_out");
        assert_eq!(json["timeout_ms"], 5000);
    }
}
