//! Look-ahead contamination tests for the screen's indicators.
//!
//! No indicator value at bar t may depend on price data from bar t+1 or later.
//!
//! Method: compute on a truncated series (bars 0..100) and the full series
//! (bars 0..200). Bars 0..100 must be identical between both runs.

use chrono::NaiveDate;
use divscreen_core::domain::Bar;
use divscreen_core::indicators::*;

/// Generate N bars of synthetic OHLCV data with realistic variation.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        // Deterministic pseudo-random walk using a simple LCG
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.05;
        price += change;
        price = price.max(10.0);

        let open = price - 0.5;
        let close = price + 0.3;

        bars.push(Bar {
            symbol: "TEST".to_string(),
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high: open.max(close) + 2.0,
            low: open.min(close) - 2.0,
            close,
            volume: 1000 + (i as u64 * 100),
        });
    }

    bars
}

fn assert_columns_match(name: &str, truncated: &[f64], full: &[f64]) {
    for (i, (&t, &f)) in truncated.iter().zip(full).enumerate() {
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            !t.is_nan() && !f.is_nan(),
            "{name}: NaN mismatch at bar {i} (truncated={t}, full={f})"
        );
        assert!(
            (t - f).abs() < 1e-10,
            "{name}: look-ahead contamination at bar {i}: truncated={t}, full={f}"
        );
    }
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let truncated = indicator.compute(&full_bars[..truncated_len]);
    let full = indicator.compute(full_bars);

    assert_eq!(truncated.len(), truncated_len, "{}: truncated length", indicator.name());
    assert_eq!(full.len(), full_bars.len(), "{}: full length", indicator.name());
    assert_columns_match(indicator.name(), &truncated, &full[..truncated_len]);
}

#[test]
fn lookahead_sma() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Sma::new(10), &bars, 100);
    assert_no_lookahead(&Sma::new(20), &bars, 100);
}

#[test]
fn lookahead_rsi() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Rsi::new(14), &bars, 100);
    assert_no_lookahead(&Rsi::new(7), &bars, 100);
}

#[test]
fn lookahead_bollinger() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Bollinger::upper(20, 2.0), &bars, 100);
    assert_no_lookahead(&Bollinger::middle(20, 2.0), &bars, 100);
    assert_no_lookahead(&Bollinger::lower(20, 2.0), &bars, 100);
    assert_no_lookahead(
        &Bollinger::lower(20, 2.0).with_deviation(BandDeviation::Sample),
        &bars,
        100,
    );
}

#[test]
fn lookahead_indicator_series() {
    let bars = make_test_bars(200);
    let config = IndicatorConfig::default();
    let truncated = IndicatorSeries::compute(&bars[..100], &config);
    let full = IndicatorSeries::compute(&bars, &config);

    assert_eq!(truncated.len(), 100);
    assert_columns_match("middle", truncated.middle(), &full.middle()[..100]);
    assert_columns_match("upper", truncated.upper(), &full.upper()[..100]);
    assert_columns_match("lower", truncated.lower(), &full.lower()[..100]);
    assert_columns_match("oscillator", truncated.oscillator(), &full.oscillator()[..100]);
}
