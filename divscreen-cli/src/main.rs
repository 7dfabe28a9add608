//! divscreen CLI: screen a dividend universe, inspect lists and indicators.
//!
//! Commands:
//! - `screen`: rank a universe by dividend yield and mean-reversion signals
//! - `lists`: show the named lists in a universe file
//! - `indicators`: print the latest bands and oscillator for one symbol

mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use divscreen_core::data::{
    CircuitBreaker, FundamentalsProvider, PriceProvider, SyntheticProvider, Universe, YahooProvider,
};
use divscreen_core::indicators::IndicatorSeries;
use divscreen_core::scoring::RiskTolerance;
use divscreen_core::signals::extract;
use divscreen_core::strategy::ScoredRow;
use divscreen_runner::{save_report, ScreenConfig, ScreenReport, Screener};
use tracing::warn;

use crate::logging::LogFormat;

#[derive(Parser)]
#[command(
    name = "divscreen",
    about = "divscreen: dividend value + mean reversion stock screener"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a universe and print ranked picks with entry/exit guidance.
    Screen {
        /// Universe file (.toml or .csv).
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Screen only this list from the universe file.
        #[arg(long)]
        list: Option<String>,

        /// Comma-separated symbols, instead of or in addition to --universe.
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Minimum market capitalization in billions (inclusive).
        #[arg(long, default_value_t = 100.0)]
        min_market_cap_billions: f64,

        /// hold-until-momentum-recovers or hold-fixed-period.
        #[arg(long, default_value = "hold-until-momentum-recovers")]
        horizon: String,

        /// conservative, balanced or aggressive. Overrides the config file.
        #[arg(long)]
        risk: Option<RiskTolerance>,

        /// Screen configuration (TOML).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use deterministic synthetic data instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Write all rows (.csv) or the full report (.json) to this file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Worker threads (1-16). Overrides the config file.
        #[arg(long)]
        workers: Option<usize>,

        /// Per-symbol timeout in seconds. Overrides the config file.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// List the named lists in a universe file.
    Lists {
        /// Universe file (.toml or .csv).
        #[arg(long)]
        universe: PathBuf,
    },
    /// Print the latest indicator values for one symbol.
    Indicators {
        symbol: String,

        /// Use deterministic synthetic data instead of Yahoo Finance.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Bars to print.
        #[arg(long, default_value_t = 10)]
        bars: usize,

        /// Screen configuration (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format)?;

    match cli.command {
        Commands::Screen {
            universe,
            list,
            symbols,
            min_market_cap_billions,
            horizon,
            risk,
            config,
            synthetic,
            top,
            output,
            workers,
            timeout_secs,
        } => run_screen(ScreenArgs {
            universe,
            list,
            symbols,
            min_market_cap_billions,
            horizon,
            risk,
            config,
            synthetic,
            top,
            output,
            workers,
            timeout_secs,
        }),
        Commands::Lists { universe } => run_lists(&universe),
        Commands::Indicators {
            symbol,
            synthetic,
            bars,
            config,
        } => run_indicators(&symbol, synthetic, bars, config),
    }
}

struct ScreenArgs {
    universe: Option<PathBuf>,
    list: Option<String>,
    symbols: Vec<String>,
    min_market_cap_billions: f64,
    horizon: String,
    risk: Option<RiskTolerance>,
    config: Option<PathBuf>,
    synthetic: bool,
    top: usize,
    output: Option<PathBuf>,
    workers: Option<usize>,
    timeout_secs: Option<u64>,
}

fn load_config(path: Option<&PathBuf>) -> Result<ScreenConfig> {
    match path {
        Some(p) => ScreenConfig::from_file(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(ScreenConfig::default()),
    }
}

type Providers = (Arc<dyn PriceProvider>, Arc<dyn FundamentalsProvider>);

fn build_providers(synthetic: bool, symbol_budget: Duration) -> Result<Providers> {
    if synthetic {
        warn!("using SYNTHETIC data: prices and fundamentals are fake");
        let p = Arc::new(SyntheticProvider::new());
        return Ok((p.clone(), p));
    }
    let breaker = Arc::new(CircuitBreaker::default_provider());
    let yahoo = Arc::new(YahooProvider::for_symbol_budget(breaker, symbol_budget)?);
    Ok((yahoo.clone(), yahoo))
}

fn collect_symbols(args: &ScreenArgs) -> Result<Vec<String>> {
    let mut symbols = Vec::new();
    if let Some(path) = &args.universe {
        let universe = Universe::from_file(path)
            .with_context(|| format!("loading universe {}", path.display()))?;
        match &args.list {
            Some(list) => symbols.extend(universe.symbols(list)?.iter().cloned()),
            None => symbols.extend(universe.all_symbols()),
        }
    } else if args.list.is_some() {
        bail!("--list requires --universe");
    }
    symbols.extend(args.symbols.iter().cloned());
    if symbols.is_empty() {
        bail!("nothing to screen: pass --universe FILE and/or --symbols A,B");
    }
    Ok(symbols)
}

fn run_screen(args: ScreenArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(workers) = args.workers {
        config.pool.max_workers = workers;
    }
    if let Some(secs) = args.timeout_secs {
        config.pool.symbol_timeout_ms = secs.saturating_mul(1000);
    }
    if let Some(risk) = args.risk {
        config.scoring.risk_tolerance = risk;
    }

    let symbols = collect_symbols(&args)?;
    let (prices, fundamentals) = build_providers(args.synthetic, config.pool.symbol_timeout())?;
    let screener = Screener::new(prices, fundamentals, config)?;

    let floor = args.min_market_cap_billions * 1e9;
    let report = screener.screen_with_horizon(&symbols, floor, &args.horizon)?;

    print_report(&report, args.top);

    if let Some(path) = &args.output {
        save_report(&report, path)?;
        println!("Saved to: {}", path.display());
    }
    Ok(())
}

fn print_report(report: &ScreenReport, top: usize) {
    println!(
        "Screened {} symbols ({} with data, source {:?}), market cap >= ${:.0}B, risk {}, horizon {}",
        report.universe_size,
        report.scored_count,
        report.price_source,
        report.market_cap_floor / 1e9,
        report.risk_tolerance,
        report.time_horizon
    );
    println!();

    if report.is_no_data() {
        println!("No data: no symbol returned both prices and fundamentals.");
    } else if report.is_no_match() {
        println!("No matches: no symbol passed the market cap floor.");
    } else {
        let shown: Vec<&ScoredRow> = report.rows.iter().take(top).collect();
        print_picks(&shown);
        println!();
        print_guidance(&shown);
        if report.rows.len() > shown.len() {
            println!("({} more rows not shown)", report.rows.len() - shown.len());
        }
    }

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &report.warnings {
            println!("  {:<8} {}", w.symbol, w.message());
        }
    }
    if !report.failures.is_empty() {
        println!();
        println!("Failed ({}):", report.failures.len());
        for f in &report.failures {
            println!("  {:<8} {}", f.symbol, f.kind);
        }
    }
}

fn flag(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

fn print_picks(rows: &[&ScoredRow]) {
    println!(
        "{:<4} {:<8} {:>8} {:>8} {:>10} {:>9} {:>11} {:>7} {:>8}",
        "#", "Symbol", "Yield", "Payout", "Mkt Cap", "Oversold", "Below Band", "Rank", "Score"
    );
    println!("{}", "-".repeat(81));
    for (i, r) in rows.iter().enumerate() {
        println!(
            "{:<4} {:<8} {:>7.2}% {:>7.1}% {:>9.1}B {:>9} {:>11} {:>7.1} {:>8.2}",
            i + 1,
            r.symbol,
            r.fundamentals.dividend_yield * 100.0,
            r.fundamentals.payout_ratio * 100.0,
            r.fundamentals.market_cap / 1e9,
            flag(r.is_oversold),
            flag(r.is_below_lower_band),
            r.dividend_rank,
            r.combined_score,
        );
    }
}

fn print_guidance(rows: &[&ScoredRow]) {
    println!("{:<8} {:<22} {}", "Symbol", "Entry", "Exit");
    println!("{}", "-".repeat(70));
    for r in rows {
        println!("{:<8} {:<22} {}", r.symbol, r.entry_point, r.exit_point);
    }
}

fn run_lists(path: &Path) -> Result<()> {
    let universe = Universe::from_file(path)
        .with_context(|| format!("loading universe {}", path.display()))?;

    println!("Universe: {}", path.display());
    println!("{:<24} {:>8}", "List", "Symbols");
    println!("{}", "-".repeat(33));
    for name in universe.list_names() {
        let count = universe.symbols(name).map(|s| s.len()).unwrap_or(0);
        println!("{:<24} {:>8}", name, count);
    }
    println!("{}", "-".repeat(33));
    println!("{:<24} {:>8}", "Distinct", universe.all_symbols().len());
    Ok(())
}

fn run_indicators(symbol: &str, synthetic: bool, show: usize, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_ref())?;
    config.validate()?;
    let symbol = symbol.trim().to_ascii_uppercase();

    let (prices, _) = build_providers(synthetic, config.pool.symbol_timeout())?;
    let (start, end) = config.data.window(chrono::Local::now().date_naive());
    let bars = prices
        .fetch_prices(&symbol, start, end)
        .with_context(|| format!("fetching prices for {symbol}"))?;
    if bars.is_empty() {
        bail!("no price history for {symbol} between {start} and {end}");
    }

    let series = IndicatorSeries::compute(&bars, &config.indicators);
    let signals = extract(&bars, &series, &config.signals);

    println!(
        "{symbol}: {} bars, {} to {}",
        bars.len(),
        bars[0].date,
        bars[bars.len() - 1].date
    );
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Date", "Close", "Lower", "Middle", "Upper", "Momentum"
    );
    println!("{}", "-".repeat(67));
    let from = bars.len().saturating_sub(show);
    for (i, bar) in bars.iter().enumerate().skip(from) {
        if let Some(p) = series.get(i) {
            println!(
                "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.1}",
                bar.date.to_string(),
                bar.close,
                p.lower,
                p.middle,
                p.upper,
                p.oscillator
            );
        }
    }
    println!();
    println!(
        "Oversold (< {}): {}   Below lower band: {}",
        config.signals.oversold_below,
        flag(signals.is_oversold),
        flag(signals.is_below_lower_band)
    );
    Ok(())
}
