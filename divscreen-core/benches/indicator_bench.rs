//! Criterion benchmarks for the screen's per-symbol hot path.
//!
//! Benchmarks:
//! 1. Indicator series compute (bands + oscillator) at typical history lengths
//! 2. Ranking a universe of signals

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use divscreen_core::domain::Bar;
use divscreen_core::fundamentals::FundamentalAttributes;
use divscreen_core::indicators::{Bollinger, Indicator, IndicatorConfig, IndicatorSeries, Rsi};
use divscreen_core::scoring::{rank, ScoringConfig, TieMethod};
use divscreen_core::signals::SymbolSignal;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Bar {
                symbol: "BENCH".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000 + (i as u64 % 500_000),
            }
        })
        .collect()
}

fn make_signals(n: usize) -> Vec<SymbolSignal> {
    (0..n)
        .map(|i| {
            let symbol = format!("S{i:04}");
            SymbolSignal {
                symbol: symbol.clone(),
                fundamentals: FundamentalAttributes {
                    symbol,
                    // Repeating yields so ties are exercised
                    dividend_yield: (i % 37) as f64 * 0.001,
                    payout_ratio: 0.5,
                    market_cap: 1e9 * (i % 400) as f64,
                },
                is_oversold: i % 3 == 0,
                is_below_lower_band: i % 5 == 0,
            }
        })
        .collect()
}

// ── 1. Indicator Series ──────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_series");
    let config = IndicatorConfig::default();

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);

        group.bench_with_input(BenchmarkId::new("bollinger_lower_20", bar_count), &bar_count, |b, _| {
            let ind = Bollinger::lower(20, 2.0);
            b.iter(|| ind.compute(black_box(&bars)));
        });

        group.bench_with_input(BenchmarkId::new("rsi_14", bar_count), &bar_count, |b, _| {
            let ind = Rsi::new(14);
            b.iter(|| ind.compute(black_box(&bars)));
        });

        group.bench_with_input(BenchmarkId::new("full_series", bar_count), &bar_count, |b, _| {
            b.iter(|| IndicatorSeries::compute(black_box(&bars), black_box(&config)));
        });
    }

    group.finish();
}

// ── 2. Ranking ───────────────────────────────────────────────────────

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");

    for &n in &[100, 500, 2000] {
        let signals = make_signals(n);
        for (label, tie_method) in [("average", TieMethod::Average), ("competition", TieMethod::Competition)] {
            let config = ScoringConfig {
                tie_method,
                ..ScoringConfig::default()
            };
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, _| {
                b.iter(|| rank(black_box(&signals), black_box(1e11), black_box(&config)));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_indicators, bench_ranking);
criterion_main!(benches);
