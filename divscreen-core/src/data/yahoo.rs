//! Yahoo Finance provider.
//!
//! Daily bars come from the v8 chart API, fundamentals from the v10
//! quoteSummary API (`summaryDetail` and `price` modules). Both endpoints share
//! one HTTP client, one retry policy and one circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataSource, FundamentalsProvider, PriceProvider};
use crate::domain::Bar;
use crate::fundamentals::{RawFundamentals, DIVIDEND_YIELD, MARKET_CAP, PAYOUT_RATIO};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://query2.finance.yahoo.com";

// ── chart API ──

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

// ── quoteSummary API ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryData {
    #[serde(default)]
    summary_detail: Option<SummaryDetail>,
    #[serde(default)]
    price: Option<PriceModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(default)]
    dividend_yield: Option<RawValue>,
    #[serde(default)]
    payout_ratio: Option<RawValue>,
    #[serde(default)]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    market_cap: Option<RawValue>,
}

/// Yahoo wraps numbers as `{"raw": 0.031, "fmt": "3.10%"}`, or `{}` when absent.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    request_timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            request_timeout: timeout,
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        })
    }

    /// Provider sized so one symbol's worst case (chart and summary requests,
    /// every attempt timing out, plus backoff) stays inside `budget`.
    pub fn for_symbol_budget(circuit_breaker: Arc<CircuitBreaker>, budget: Duration) -> Result<Self, DataError> {
        // 2 requests x 2 attempts x budget/5, plus 2 backoffs of budget/20
        Ok(Self::new(circuit_breaker, budget / 5)?.with_retries(1, budget / 20))
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{BASE_URL}/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    fn summary_url(symbol: &str) -> String {
        format!("{BASE_URL}/v10/finance/quoteSummary/{symbol}?modules=summaryDetail,price")
    }

    /// GET `url` and decode JSON, with retry and circuit breaker logic.
    fn get_json<T: DeserializeOwned>(&self, symbol: &str, url: &str) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                debug!(
                    symbol,
                    cooldown_secs = self.circuit_breaker.remaining_cooldown().as_secs(),
                    "circuit breaker open, request refused"
                );
                return Err(DataError::CircuitBreakerTripped);
            }

            debug!(symbol, attempt, "yahoo request");

            let resp = match self.client.get(url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let body = resp.json::<T>().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
            })?;
            self.circuit_breaker.record_success();
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

fn api_error(symbol: &str, err: Option<ApiError>, what: &str) -> DataError {
    match err {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormatChanged(format!("empty {what} result with no error")),
    }
}

/// Parse a chart response into adjusted, date-ascending bars.
///
/// OHLC are scaled by adjclose/close so that, like the closes, they account
/// for splits and dividends. When a date repeats, the later row wins.
fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
    let result = match resp.chart.result {
        Some(result) => result,
        None => return Err(api_error(symbol, resp.chart.error, "chart")),
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

    // A symbol with no trading days in range has no timestamp array at all
    let Some(timestamps) = data.timestamp else {
        return Err(DataError::EmptyHistory {
            symbol: symbol.to_string(),
        });
    };

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut by_date: BTreeMap<NaiveDate, Bar> = BTreeMap::new();

    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();
        let adj_close = adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten());

        // Skip rows where all OHLCV are None (holidays/non-trading days)
        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none() {
            continue;
        }

        let factor = match (close, adj_close) {
            (Some(c), Some(a)) if c != 0.0 && c.is_finite() && a.is_finite() => a / c,
            _ => 1.0,
        };
        let adjust = |v: Option<f64>| v.map_or(f64::NAN, |v| v * factor);

        by_date.insert(
            date,
            Bar {
                symbol: symbol.to_string(),
                date,
                open: adjust(open),
                high: adjust(high),
                low: adjust(low),
                close: adjust(close),
                volume: volume.unwrap_or(0),
            },
        );
    }

    if by_date.is_empty() {
        return Err(DataError::EmptyHistory {
            symbol: symbol.to_string(),
        });
    }

    Ok(by_date.into_values().collect())
}

/// Parse a quoteSummary response into a raw attribute bag.
fn parse_summary(symbol: &str, resp: SummaryResponse) -> Result<RawFundamentals, DataError> {
    let result = match resp.quote_summary.result {
        Some(result) => result,
        None => return Err(api_error(symbol, resp.quote_summary.error, "quoteSummary")),
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

    let detail = data.summary_detail.unwrap_or_default();
    let price = data.price.unwrap_or_default();

    let mut bag = RawFundamentals::new(symbol);
    bag.insert_opt(DIVIDEND_YIELD, raw(&detail.dividend_yield));
    bag.insert_opt(PAYOUT_RATIO, raw(&detail.payout_ratio));
    bag.insert_opt(MARKET_CAP, raw(&price.market_cap).or(raw(&detail.market_cap)));
    Ok(bag)
}

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn source(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn fetch_prices(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, DataError> {
        let url = Self::chart_url(symbol, start, end);
        let resp: ChartResponse = self.get_json(symbol, &url)?;
        let bars = parse_chart(symbol, resp)?;
        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

impl FundamentalsProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_fundamentals(&self, symbol: &str) -> Result<RawFundamentals, DataError> {
        let url = Self::summary_url(symbol);
        let resp: SummaryResponse = self.get_json(symbol, &url)?;
        parse_summary(symbol, resp)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
