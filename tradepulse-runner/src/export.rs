//! Artifact export: run manifest, trade tape and equity curve.
//!
//! A run lands in its own directory under the chosen output root:
//! `<output>/<symbol>-<run id prefix>/{manifest.json, trades.csv, equity.csv}`.
//! The manifest carries a `schema_version`; unknown versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tradepulse_core::StrategyParams;

use crate::backtest::{BacktestResult, EquityPoint, Trade, SCHEMA_VERSION};
use crate::metrics::PerformanceMetrics;

/// Summary written next to the CSV artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub symbol: String,
    pub dataset_hash: String,
    pub params: StrategyParams,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub bar_count: usize,
    pub first_bar: Option<DateTime<Utc>>,
    pub last_bar: Option<DateTime<Utc>>,
    pub metrics: PerformanceMetrics,
}

impl RunManifest {
    pub fn from_result(result: &BacktestResult) -> Self {
        Self {
            schema_version: result.schema_version,
            run_id: result.run_id.clone(),
            symbol: result.symbol.clone(),
            dataset_hash: result.dataset_hash.clone(),
            params: result.params,
            initial_capital: result.initial_capital,
            final_equity: result.final_equity(),
            bar_count: result.bar_count,
            first_bar: result.equity_curve.first().map(|p| p.timestamp),
            last_bar: result.equity_curve.last().map(|p| p.timestamp),
            metrics: result.metrics.clone(),
        }
    }
}

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub manifest: PathBuf,
    pub trades_csv: PathBuf,
    pub equity_csv: PathBuf,
}

/// Directory name for a run: symbol plus the first 12 hex digits of the run id.
pub fn run_dir_name(result: &BacktestResult) -> String {
    let prefix: String = result.run_id.chars().take(12).collect();
    format!("{}-{}", result.symbol, prefix)
}

/// Write manifest, trade tape and equity curve for one run.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<ArtifactPaths> {
    let dir = output_dir.join(run_dir_name(result));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create artifact directory {}", dir.display()))?;

    let paths = ArtifactPaths {
        manifest: dir.join("manifest.json"),
        trades_csv: dir.join("trades.csv"),
        equity_csv: dir.join("equity.csv"),
        dir,
    };

    write_manifest(&paths.manifest, &RunManifest::from_result(result))?;
    write_trades_csv(&paths.trades_csv, &result.trades)?;
    write_equity_csv(&paths.equity_csv, &result.equity_curve)?;
    Ok(paths)
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    let json =
        serde_json::to_string_pretty(manifest).context("Failed to serialize run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}

/// Read a manifest back, rejecting schema versions newer than this build.
pub fn load_manifest(path: &Path) -> Result<RunManifest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let manifest: RunManifest =
        serde_json::from_str(&json).context("Failed to deserialize run manifest")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

/// One row per round trip, columns in [`Trade`] field order.
pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create trades CSV {}", path.display()))?;
    if trades.is_empty() {
        wtr.write_record([
            "symbol",
            "side",
            "entry_time",
            "entry_price",
            "exit_time",
            "exit_price",
            "units",
            "stop_price",
            "exit_reason",
            "gross_pnl",
            "commission",
            "net_pnl",
            "bars_held",
        ])?;
    }
    for trade in trades {
        wtr.serialize(trade).context("Failed to write trade row")?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush trades CSV {}", path.display()))?;
    Ok(())
}

pub fn write_equity_csv(path: &Path, equity: &[EquityPoint]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create equity CSV {}", path.display()))?;
    wtr.write_record(["timestamp", "equity"])?;
    for point in equity {
        wtr.write_record([point.timestamp.to_rfc3339(), format!("{:.4}", point.equity)])?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush equity CSV {}", path.display()))?;
    Ok(())
}
