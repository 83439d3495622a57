//! TradePulse CLI: signal, sizing, backtest and replay commands.
//!
//! Commands:
//! - `signal`: latest crossover signal and stops for a bar file, as JSON
//! - `size`: units to trade for an entry/stop pair
//! - `backtest`: simulate the strategy on bar files or synthetic data
//! - `replay`: drive the live loop from a recorded tick file against a paper account

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tradepulse_core::domain::get_pip_value_per_unit;
use tradepulse_core::{position_size_by_risk, RiskParams, SignalEngine};
use tradepulse_runner::live::Pacing;
use tradepulse_runner::{
    generate_synthetic_bars, load_bars_csv, load_ticks_csv, run_portfolio, save_artifacts,
    BacktestResult, Backtester, LiveTrader, PaperVenue, ReplayFeed, TradingConfig,
};

#[derive(Parser)]
#[command(
    name = "tradepulse",
    about = "TradePulse CLI: SMA crossover signals with ATR stops and risk sizing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the latest signal record for a bar file as JSON.
    Signal {
        /// CSV with timestamp,open,high,low,close[,volume] columns.
        #[arg(long)]
        bars: PathBuf,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print every row instead of only the latest.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Compute a risk-based position size.
    Size {
        #[arg(long, allow_negative_numbers = true)]
        entry: f64,

        #[arg(long, allow_negative_numbers = true)]
        stop: f64,

        #[arg(long)]
        equity: f64,

        /// Symbol used to pick the pip value (e.g. EUR_USD, USD_JPY, SPY).
        #[arg(long, default_value = "EUR_USD")]
        instrument: String,

        /// Fraction of equity risked on the trade.
        #[arg(long, default_value_t = 0.005)]
        risk: f64,

        #[arg(long)]
        units_cap: Option<u64>,

        #[arg(long)]
        max_position_size: Option<f64>,
    },
    /// Backtest the strategy on one or more instruments.
    Backtest {
        /// Bar files; the symbol is taken from each file stem.
        #[arg(long, num_args = 1.., conflicts_with = "synthetic")]
        bars: Vec<PathBuf>,

        /// Use deterministic synthetic bars instead of files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Symbols for synthetic data.
        #[arg(long, num_args = 1.., default_value = "SYNTH")]
        symbol: Vec<String>,

        /// Number of synthetic bars per symbol.
        #[arg(long, default_value_t = 2_000)]
        count: usize,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for run artifacts.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Replay a tick file through the live loop with a paper account.
    Replay {
        /// CSV with timestamp,bid,ask or timestamp,price columns.
        #[arg(long)]
        ticks: PathBuf,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Paper account equity.
        #[arg(long, default_value_t = 10_000.0)]
        equity: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Signal { bars, config, all } => run_signal(&bars, config.as_deref(), all),
        Commands::Size {
            entry,
            stop,
            equity,
            instrument,
            risk,
            units_cap,
            max_position_size,
        } => run_size(entry, stop, equity, &instrument, risk, units_cap, max_position_size),
        Commands::Backtest {
            bars,
            synthetic,
            symbol,
            count,
            config,
            output_dir,
        } => run_backtest_cmd(
            bars,
            synthetic,
            symbol,
            count,
            config.as_deref(),
            output_dir.as_deref(),
        ),
        Commands::Replay {
            ticks,
            config,
            equity,
        } => run_replay(&ticks, config.as_deref(), equity),
    }
}

/// Defaults, then the optional TOML file, then `TRADEPULSE_*` environment overrides.
fn load_config(path: Option<&Path>) -> Result<TradingConfig> {
    let mut config = match path {
        Some(path) => TradingConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TradingConfig::default(),
    };
    config
        .apply_overrides(|key| std::env::var(key).ok())
        .context("applying environment overrides")?;
    Ok(config)
}

fn run_signal(bars_path: &Path, config_path: Option<&Path>, all: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let series = load_bars_csv(bars_path)
        .with_context(|| format!("loading bars {}", bars_path.display()))?;
    let engine = SignalEngine::new(config.strategy)?;

    let json = if all {
        serde_json::to_string_pretty(&engine.get_signals(series.as_slice()))?
    } else {
        serde_json::to_string_pretty(&engine.get_last_signal(series.as_slice()))?
    };
    println!("{json}");
    Ok(())
}

fn run_size(
    entry: f64,
    stop: f64,
    equity: f64,
    instrument: &str,
    risk: f64,
    units_cap: Option<u64>,
    max_position_size: Option<f64>,
) -> Result<()> {
    let mut params = RiskParams::new(equity, risk);
    if let Some(max) = max_position_size {
        params = params.with_max_position_size(max);
    }
    let pip_value = get_pip_value_per_unit(instrument);
    let units = position_size_by_risk(entry, stop, pip_value, &params, units_cap);

    println!("Instrument:     {instrument}");
    println!("Pip value/unit: {pip_value}");
    println!("Risk amount:    {:.2}", params.risk_amount());
    println!("Stop distance:  {}", (entry - stop).abs());
    println!("Units:          {units}");
    Ok(())
}

fn run_backtest_cmd(
    bar_files: Vec<PathBuf>,
    synthetic: bool,
    symbols: Vec<String>,
    count: usize,
    config_path: Option<&Path>,
    output_dir: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;

    let series = if synthetic {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().context("bad start")?;
        symbols
            .into_iter()
            .map(|sym| {
                let bars = generate_synthetic_bars(&sym, start, count, config.granularity);
                (sym, bars)
            })
            .collect::<Vec<_>>()
    } else {
        if bar_files.is_empty() {
            bail!("one of --bars or --synthetic is required");
        }
        bar_files
            .iter()
            .map(|path| {
                let symbol = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .with_context(|| format!("no symbol in file name {}", path.display()))?
                    .to_string();
                let bars = load_bars_csv(path)
                    .with_context(|| format!("loading bars {}", path.display()))?;
                Ok((symbol, bars.into_bars()))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let backtester = Backtester::new(config)?;
    info!(instruments = series.len(), run_id = %backtester.config().run_id(), "running backtests");

    let mut failed = 0;
    for (symbol, outcome) in run_portfolio(&backtester, &series) {
        match outcome {
            Ok(result) => {
                print_summary(&result);
                if synthetic {
                    println!("WARNING: Results based on SYNTHETIC data");
                }
                if let Some(dir) = output_dir {
                    let paths = save_artifacts(&result, dir)?;
                    println!("Artifacts saved to: {}", paths.dir.display());
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("Error for {symbol}: {e}");
            }
        }
    }

    if failed == series.len() {
        bail!("no backtest completed");
    }
    Ok(())
}

fn run_replay(ticks_path: &Path, config_path: Option<&Path>, equity: f64) -> Result<()> {
    let config = load_config(config_path)?;
    let quotes = load_ticks_csv(ticks_path)
        .with_context(|| format!("loading ticks {}", ticks_path.display()))?;

    let mut trader = LiveTrader::new(config, ReplayFeed::new(quotes), PaperVenue::new(equity))?
        .with_pacing(Pacing::none());
    let summary = trader.run()?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    for order in trader.venue().orders() {
        println!("{}", serde_json::to_string(order)?);
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    if let (Some(first), Some(last)) = (result.equity_curve.first(), result.equity_curve.last()) {
        println!("Period:         {} to {}", first.timestamp, last.timestamp);
    }
    println!("Bars:           {}", result.bar_count);
    println!("Signals:        {}", result.signal_count);
    println!("Trades:         {}", result.metrics.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {:.2}", result.final_equity());
    println!("Total Return:   {:.2}%", result.metrics.total_return * 100.0);
    println!("CAGR:           {:.2}%", result.metrics.cagr * 100.0);
    println!("Sharpe:         {:.3}", result.metrics.sharpe);
    println!("Max Drawdown:   {:.2}%", result.metrics.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", result.metrics.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", result.metrics.profit_factor);
}
