//! Serializable screen configuration.
//!
//! Every section has defaults, so an empty TOML file is a valid config:
//!
//! ```toml
//! [indicators]
//! band_window = 20
//! momentum_period = 14
//!
//! [pool]
//! max_workers = 8
//! symbol_timeout_ms = 5000
//! ```

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use divscreen_core::indicators::IndicatorConfig;
use divscreen_core::scoring::ScoringConfig;
use divscreen_core::signals::SignalConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on screen worker threads.
pub const MAX_WORKERS: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(String),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Worker pool sizing and per-symbol timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Requested worker threads; clamped to 1..=16 when the pool is built.
    pub max_workers: usize,
    /// Wall-clock budget for one symbol's fetches and compute.
    pub symbol_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            symbol_timeout_ms: 5_000,
        }
    }
}

impl PoolConfig {
    pub fn worker_count(&self) -> usize {
        self.max_workers.clamp(1, MAX_WORKERS)
    }

    pub fn symbol_timeout(&self) -> Duration {
        Duration::from_millis(self.symbol_timeout_ms)
    }
}

/// History window requested from the price provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Calendar days of history ending at `as_of`.
    pub lookback_days: u32,
    /// Last day of the window; today when unset.
    pub as_of: Option<NaiveDate>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            lookback_days: 365,
            as_of: None,
        }
    }
}

impl DataConfig {
    /// Inclusive `(start, end)` window, with `today` standing in for an unset `as_of`.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = self.as_of.unwrap_or(today);
        let start = end - chrono::Duration::days(i64::from(self.lookback_days));
        (start, end)
    }
}

/// Full configuration for a screen run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub indicators: IndicatorConfig,
    pub signals: SignalConfig,
    pub scoring: ScoringConfig,
    pub pool: PoolConfig,
    pub data: DataConfig,
}

impl ScreenConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject parameter values the indicator engine and pool cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ind = &self.indicators;
        if ind.band_window == 0 {
            return Err(invalid("indicators.band_window", "must be at least 1"));
        }
        if !ind.band_multiplier.is_finite() || ind.band_multiplier < 0.0 {
            return Err(invalid(
                "indicators.band_multiplier",
                format!("must be a non-negative number, got {}", ind.band_multiplier),
            ));
        }
        if ind.momentum_period == 0 {
            return Err(invalid("indicators.momentum_period", "must be at least 1"));
        }

        let threshold = self.signals.oversold_below;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(invalid(
                "signals.oversold_below",
                format!("must lie in [0, 100], got {threshold}"),
            ));
        }

        for (field, w) in [
            ("scoring.dividend_weight", self.scoring.dividend_weight),
            ("scoring.technical_weight", self.scoring.technical_weight),
        ] {
            if !w.is_finite() {
                return Err(invalid(field, format!("must be finite, got {w}")));
            }
        }

        if self.pool.symbol_timeout_ms == 0 {
            return Err(invalid("pool.symbol_timeout_ms", "must be greater than 0"));
        }
        if self.data.lookback_days == 0 {
            return Err(invalid("data.lookback_days", "must be greater than 0"));
        }
        Ok(())
    }

    /// Deterministic content hash of the settings that shape screen output.
    ///
    /// Pool settings are excluded: worker count and timeout never change the
    /// rows of a run that completes.
    pub fn config_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        // Plain data structs; serialization cannot fail
        for part in [
            serde_json::to_vec(&self.indicators),
            serde_json::to_vec(&self.signals),
            serde_json::to_vec(&self.scoring),
            serde_json::to_vec(&self.data),
        ] {
            hasher.update(&part.unwrap_or_default());
            hasher.update(b"|");
        }
        hasher.finalize().to_hex().to_string()
    }
}
