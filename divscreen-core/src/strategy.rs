//! Entry/exit guidance attached to ranked rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::fundamentals::FundamentalAttributes;
use crate::scoring::RankedRow;

pub const ENTRY_BUY_NOW: &str = "buy now (oversold)";
pub const EXIT_MOMENTUM_RECOVERS: &str = "sell when momentum recovers above 50";
pub const EXIT_FIXED_PERIOD: &str = "hold for the fixed period";

/// Holding policy selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimeHorizon {
    #[default]
    HoldUntilMomentumRecovers,
    HoldFixedPeriod,
}

impl TimeHorizon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HoldUntilMomentumRecovers => "hold-until-momentum-recovers",
            Self::HoldFixedPeriod => "hold-fixed-period",
        }
    }

    pub fn exit_point(&self) -> &'static str {
        match self {
            Self::HoldUntilMomentumRecovers => EXIT_MOMENTUM_RECOVERS,
            Self::HoldFixedPeriod => EXIT_FIXED_PERIOD,
        }
    }
}

impl fmt::Display for TimeHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized time horizon '{0}' (expected hold-until-momentum-recovers or hold-fixed-period)")]
pub struct ParseHorizonError(pub String);

impl FromStr for TimeHorizon {
    type Err = ParseHorizonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hold-until-momentum-recovers" => Ok(Self::HoldUntilMomentumRecovers),
            "hold-fixed-period" => Ok(Self::HoldFixedPeriod),
            other => Err(ParseHorizonError(other.to_string())),
        }
    }
}

/// Final output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRow {
    pub symbol: String,
    pub fundamentals: FundamentalAttributes,
    pub is_oversold: bool,
    pub is_below_lower_band: bool,
    pub technical_score: u8,
    pub dividend_rank: f64,
    pub combined_score: f64,
    pub entry_point: String,
    pub exit_point: String,
}

/// Attach guidance to every ranked row, preserving order.
///
/// Every row gets the same entry message, whether or not it tested positive
/// on a technical flag.
pub fn annotate(rows: Vec<RankedRow>, horizon: TimeHorizon) -> Vec<ScoredRow> {
    rows.into_iter()
        .map(|row| ScoredRow {
            symbol: row.symbol,
            fundamentals: row.fundamentals,
            is_oversold: row.is_oversold,
            is_below_lower_band: row.is_below_lower_band,
            technical_score: row.technical_score,
            dividend_rank: row.dividend_rank,
            combined_score: row.combined_score,
            entry_point: ENTRY_BUY_NOW.to_string(),
            exit_point: horizon.exit_point().to_string(),
        })
        .collect()
}
