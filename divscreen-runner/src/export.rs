//! Export: JSON and CSV renditions of a screen report.
//!
//! JSON carries the full report including `schema_version`; newer versions
//! are rejected on load. CSV carries the ranked rows only.

use std::path::Path;

use anyhow::{bail, Context, Result};
use divscreen_core::strategy::ScoredRow;

use crate::screener::{ScreenReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `ScreenReport` to pretty JSON.
pub fn export_json(report: &ScreenReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ScreenReport to JSON")
}

/// Deserialize a `ScreenReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ScreenReport> {
    let report: ScreenReport =
        serde_json::from_str(json).context("failed to deserialize ScreenReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export ranked rows as CSV, one line per row in ranked order.
///
/// Columns: symbol, dividend_yield, payout_ratio, market_cap, is_oversold,
/// is_below_lower_band, technical_score, dividend_rank, combined_score,
/// entry_point, exit_point
pub fn export_rows_csv(rows: &[ScoredRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "symbol",
        "dividend_yield",
        "payout_ratio",
        "market_cap",
        "is_oversold",
        "is_below_lower_band",
        "technical_score",
        "dividend_rank",
        "combined_score",
        "entry_point",
        "exit_point",
    ])?;

    for r in rows {
        wtr.write_record([
            &r.symbol,
            &format!("{:.6}", r.fundamentals.dividend_yield),
            &format!("{:.6}", r.fundamentals.payout_ratio),
            &format!("{:.0}", r.fundamentals.market_cap),
            &r.is_oversold.to_string(),
            &r.is_below_lower_band.to_string(),
            &r.technical_score.to_string(),
            &r.dividend_rank.to_string(),
            &format!("{:.4}", r.combined_score),
            &r.entry_point,
            &r.exit_point,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── File output ────────────────────────────────────────────────────

/// Write the report to `path`; `.csv` writes the rows, `.json` the full report.
pub fn save_report(report: &ScreenReport, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let content = match ext.as_deref() {
        Some("csv") => export_rows_csv(&report.rows)?,
        Some("json") => export_json(report)?,
        _ => bail!(
            "unsupported output format for {} (expected .csv or .json)",
            path.display()
        ),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
