//! Integration tests for the file → backtest → artifacts pipeline.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::fmt::Write as _;
use std::path::Path;
use tradepulse_core::aggregator::Granularity;
use tradepulse_runner::data_loader::dataset_hash;
use tradepulse_runner::export::load_manifest;
use tradepulse_runner::{
    generate_synthetic_bars, load_bars_csv, run_backtest, run_portfolio, save_artifacts,
    Backtester, ExitReason, TradingConfig,
};

const CONFIG: &str = r#"
instrument = "TEST"
granularity = "D"

[strategy]
fast = 2
slow = 3
atr_window = 2
atr_mult = 2.0

[backtest]
initial_capital = 10000.0
commission = 0.0
"#;

/// Open at the previous close, half a point of wick either side.
fn write_bars_csv(path: &Path, closes: &[f64]) {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut out = String::from("timestamp,open,high,low,close\n");
    for (i, &c) in closes.iter().enumerate() {
        let o = if i == 0 { c } else { closes[i - 1] };
        let ts = t0 + Duration::days(i as i64);
        writeln!(
            out,
            "{},{},{},{},{}",
            ts.to_rfc3339(),
            o,
            o.max(c) + 0.5,
            o.min(c) - 0.5,
            c
        )
        .unwrap();
    }
    std::fs::write(path, out).unwrap();
}

#[test]
fn csv_bars_backtest_and_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let bars_path = tmp.path().join("TEST.csv");
    write_bars_csv(
        &bars_path,
        &[5.0, 4.0, 3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 6.0, 5.0, 4.0, 3.0],
    );

    let config = TradingConfig::from_toml_str(CONFIG).unwrap();
    let bars = load_bars_csv(&bars_path).unwrap().into_bars();
    let result = run_backtest("TEST", &bars, &config).unwrap();

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.entry_price, 3.0);
    assert_eq!(trade.exit_price, 5.0);
    assert_eq!(trade.exit_reason, ExitReason::Signal);
    assert_eq!(trade.units, 12);
    assert_eq!(result.final_equity(), 10_024.0);
    assert_eq!(result.dataset_hash, dataset_hash(&bars));
    assert_eq!(result.run_id, config.run_id());

    let out = tmp.path().join("runs");
    let paths = save_artifacts(&result, &out).unwrap();
    let manifest = load_manifest(&paths.manifest).unwrap();
    assert_eq!(manifest.symbol, "TEST");
    assert_eq!(manifest.dataset_hash, result.dataset_hash);
    assert_eq!(manifest.metrics, result.metrics);

    let mut trades = csv::Reader::from_path(&paths.trades_csv).unwrap();
    assert_eq!(trades.records().count(), 1);
    let mut equity = csv::Reader::from_path(&paths.equity_csv).unwrap();
    assert_eq!(equity.records().count(), bars.len());
}

#[test]
fn synthetic_backtest_is_deterministic_and_balanced() {
    let config = TradingConfig::default();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let bars = generate_synthetic_bars("SPY", start, 1_500, Granularity::default());

    let a = run_backtest("SPY", &bars, &config).unwrap();
    let b = run_backtest("SPY", &bars, &config).unwrap();
    assert_eq!(a.trades, b.trades);
    assert_eq!(a.equity_curve, b.equity_curve);
    assert_eq!(a.equity_curve.len(), bars.len());

    // Every position is closed by the end, so equity is fully realised.
    let realised: f64 = a.trades.iter().map(|t| t.net_pnl).sum();
    assert!((a.final_equity() - (config.backtest.initial_capital + realised)).abs() < 1e-6);

    for t in &a.trades {
        assert!(t.units > 0);
        assert!(t.units <= config.risk.units_cap.unwrap());
        assert!(t.exit_time >= t.entry_time);
    }
}

#[test]
fn portfolio_runs_each_symbol_independently() {
    let config = TradingConfig::default();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let symbols = ["SPY", "EUR_USD", "USD_JPY"];
    let series: Vec<_> = symbols
        .iter()
        .map(|s| (s.to_string(), generate_synthetic_bars(s, start, 800, config.granularity)))
        .collect();

    let backtester = Backtester::new(config.clone()).unwrap();
    let results = run_portfolio(&backtester, &series);

    assert_eq!(results.len(), 3);
    for ((symbol, outcome), (expected, bars)) in results.iter().zip(&series) {
        assert_eq!(symbol, expected);
        let result = outcome.as_ref().unwrap();
        let alone = run_backtest(symbol, bars, &config).unwrap();
        assert_eq!(result.trades, alone.trades);
        assert_eq!(result.dataset_hash, alone.dataset_hash);
    }
}

#[test]
fn too_few_bars_is_an_error() {
    let config = TradingConfig::default();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let bars = generate_synthetic_bars("SPY", start, 30, config.granularity);
    let err = run_backtest("SPY", &bars, &config).unwrap_err();
    assert!(err.to_string().contains("need at least 51 bars"), "{err}");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn equity_accounts_for_every_trade(symbol in "[A-Z]{3,6}", commission in 0.0..0.002_f64) {
        let mut config = TradingConfig::default();
        config.strategy.fast = 5;
        config.strategy.slow = 15;
        config.live.min_history = 15;
        config.backtest.commission = commission;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = generate_synthetic_bars(&symbol, start, 400, config.granularity);

        let result = run_backtest(&symbol, &bars, &config).unwrap();
        let realised: f64 = result.trades.iter().map(|t| t.net_pnl).sum();
        prop_assert!((result.final_equity() - (config.backtest.initial_capital + realised)).abs() < 1e-6);

        let mut equity_before = config.backtest.initial_capital;
        for t in &result.trades {
            prop_assert!(t.commission >= 0.0);
            // Without a gap, a stop-out never loses more than the risk budget.
            if t.exit_reason == ExitReason::Stop && t.exit_price == t.stop_price {
                let budget = equity_before * config.risk.risk_per_trade;
                prop_assert!(t.gross_pnl >= -budget * (1.0 + 1e-6));
            }
            equity_before += t.net_pnl;
        }
    }
}
