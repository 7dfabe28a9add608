//! Scoring and ranking: dividend rank plus technical signal count.
//!
//! Pipeline over the symbols that produced both prices and fundamentals:
//! 1. Drop symbols below the market-cap floor (floor is inclusive).
//! 2. Rank dividend yield descending (rank 1 = highest yield).
//! 3. Technical score = oversold flag + below-lower-band flag (0..=2).
//! 4. Combined = rank * dividend_weight + technical * technical_weight.
//! 5. Stable sort by combined score, descending.
//!
//! The ordering is reproduced exactly from the screen this engine replaces,
//! including the fact that a larger rank number (lower yield) raises the
//! combined score.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::fundamentals::FundamentalAttributes;
use crate::signals::SymbolSignal;

/// User-selected risk tolerance.
///
/// Carried through to the report; no weighting policy reads it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown risk tolerance '{0}' (expected conservative, balanced or aggressive)")]
pub struct ParseRiskError(pub String);

impl FromStr for RiskTolerance {
    type Err = ParseRiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "balanced" => Ok(Self::Balanced),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(ParseRiskError(s.to_string())),
        }
    }
}

/// How tied yields share a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieMethod {
    /// Mean of the positions the tied group occupies (2 and 3 → 2.5).
    #[default]
    Average,
    /// Lowest position of the tied group (2 and 3 → 2).
    Competition,
}

/// Weights and ranking policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub dividend_weight: f64,
    pub technical_weight: f64,
    pub tie_method: TieMethod,
    pub risk_tolerance: RiskTolerance,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            dividend_weight: 0.6,
            technical_weight: 0.4,
            tie_method: TieMethod::Average,
            risk_tolerance: RiskTolerance::Balanced,
        }
    }
}

/// A symbol that survived the floor, with its scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub symbol: String,
    pub fundamentals: FundamentalAttributes,
    pub is_oversold: bool,
    pub is_below_lower_band: bool,
    pub technical_score: u8,
    pub dividend_rank: f64,
    pub combined_score: f64,
}

/// Descending ranks of `values`, 1-based, ties resolved by `method`.
///
/// NaN is not expected here (fundamentals are normalized) and sorts last.
pub fn rank_descending(values: &[f64], method: TieMethod) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start+1 ..= end share one rank
        let rank = match method {
            TieMethod::Average => (start + 1 + end) as f64 / 2.0,
            TieMethod::Competition => (start + 1) as f64,
        };
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Filter, score and order `signals`. Input order decides ties.
pub fn rank(signals: &[SymbolSignal], market_cap_floor: f64, config: &ScoringConfig) -> Vec<RankedRow> {
    let survivors: Vec<&SymbolSignal> = signals
        .iter()
        .filter(|s| s.fundamentals.market_cap >= market_cap_floor)
        .collect();

    if survivors.is_empty() {
        return Vec::new();
    }

    let yields: Vec<f64> = survivors
        .iter()
        .map(|s| s.fundamentals.dividend_yield)
        .collect();
    let ranks = rank_descending(&yields, config.tie_method);

    let mut rows: Vec<RankedRow> = survivors
        .into_iter()
        .zip(ranks)
        .map(|(s, dividend_rank)| {
            let technical_score = u8::from(s.is_oversold) + u8::from(s.is_below_lower_band);
            RankedRow {
                symbol: s.symbol.clone(),
                fundamentals: s.fundamentals.clone(),
                is_oversold: s.is_oversold,
                is_below_lower_band: s.is_below_lower_band,
                technical_score,
                dividend_rank,
                combined_score: dividend_rank * config.dividend_weight
                    + f64::from(technical_score) * config.technical_weight,
            }
        })
        .collect();

    // sort_by is stable
    rows.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(symbol: &str, yld: f64, cap: f64, oversold: bool, below: bool) -> SymbolSignal {
        SymbolSignal {
            symbol: symbol.into(),
            fundamentals: FundamentalAttributes {
                symbol: symbol.into(),
                dividend_yield: yld,
                payout_ratio: 0.5,
                market_cap: cap,
            },
            is_oversold: oversold,
            is_below_lower_band: below,
        }
    }

    #[test]
    fn average_ranks_share_ties() {
        let ranks = rank_descending(&[0.05, 0.03, 0.03, 0.01], TieMethod::Average);
        assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn competition_ranks_share_ties() {
        let ranks = rank_descending(&[0.05, 0.03, 0.03, 0.01], TieMethod::Competition);
        assert_eq!(ranks, vec![1.0, 2.0, 2.0, 4.0]);
    }

    #[test]
    fn all_tied_get_middle_rank() {
        let ranks = rank_descending(&[0.0, 0.0, 0.0], TieMethod::Average);
        assert_eq!(ranks, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn floor_is_inclusive() {
        let signals = vec![
            signal("AT", 0.02, 10e9, false, false),
            signal("BELOW", 0.02, 10e9 - 1.0, false, false),
        ];
        let rows = rank(&signals, 10e9, &ScoringConfig::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AT");
    }

    #[test]
    fn empty_after_floor_is_empty() {
        let signals = vec![signal("SMALL", 0.04, 1e9, true, true)];
        assert!(rank(&signals, 10e9, &ScoringConfig::default()).is_empty());
        assert!(rank(&[], 0.0, &ScoringConfig::default()).is_empty());
    }

    #[test]
    fn oversold_high_yield_beats_plain_low_yield() {
        let signals = vec![
            signal("A", 0.05, 50e9, true, true),
            signal("B", 0.02, 200e9, false, false),
        ];
        let rows = rank(&signals, 10e9, &ScoringConfig::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "A");
        assert_eq!(rows[0].technical_score, 2);
        assert_eq!(rows[0].dividend_rank, 1.0);
        assert!((rows[0].combined_score - 1.4).abs() < 1e-12);
        assert_eq!(rows[1].symbol, "B");
        assert_eq!(rows[1].technical_score, 0);
        assert!((rows[1].combined_score - 1.2).abs() < 1e-12);
    }

    #[test]
    fn larger_rank_number_scores_higher() {
        let signals = vec![
            signal("HIGH", 0.06, 1e9, false, false),
            signal("LOW", 0.01, 1e9, false, false),
        ];
        let rows = rank(&signals, 0.0, &ScoringConfig::default());
        assert_eq!(rows[0].symbol, "LOW");
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let signals = vec![
            signal("FIRST", 0.03, 1e9, false, false),
            signal("SECOND", 0.03, 1e9, false, false),
            signal("THIRD", 0.03, 1e9, false, false),
        ];
        let rows = rank(&signals, 0.0, &ScoringConfig::default());
        let order: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["FIRST", "SECOND", "THIRD"]);
        assert!(rows.iter().all(|r| r.dividend_rank == 2.0));
    }

    #[test]
    fn weights_are_configurable() {
        let signals = vec![signal("A", 0.05, 1e9, true, false)];
        let config = ScoringConfig {
            dividend_weight: 1.0,
            technical_weight: 10.0,
            ..ScoringConfig::default()
        };
        let rows = rank(&signals, 0.0, &config);
        assert!((rows[0].combined_score - 11.0).abs() < 1e-12);
    }

    #[test]
    fn risk_tolerance_does_not_change_scores() {
        let signals = vec![
            signal("A", 0.05, 1e9, true, false),
            signal("B", 0.01, 1e9, false, true),
        ];
        let base = rank(&signals, 0.0, &ScoringConfig::default());
        for risk in [RiskTolerance::Conservative, RiskTolerance::Aggressive] {
            let config = ScoringConfig {
                risk_tolerance: risk,
                ..ScoringConfig::default()
            };
            assert_eq!(rank(&signals, 0.0, &config), base);
        }
    }

    #[test]
    fn risk_tolerance_parses() {
        assert_eq!("Aggressive".parse::<RiskTolerance>(), Ok(RiskTolerance::Aggressive));
        assert_eq!(
            " yolo".parse::<RiskTolerance>(),
            Err(ParseRiskError(" yolo".into()))
        );
        assert!(ParseRiskError("yolo".into()).to_string().contains("'yolo'"));
        assert_eq!(RiskTolerance::Conservative.to_string(), "conservative");
    }
}
