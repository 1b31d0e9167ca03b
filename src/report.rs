//! Result export: order ledgers, equity curves and statistics

use anyhow::{Context, Result};
use csv::Writer;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::backtest::EquityPoint;
use crate::stats::PerformanceStats;
use crate::Order;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `{results_dir}/{stem}.{ext}`, creating the directory if needed
pub fn results_path(results_dir: impl AsRef<Path>, stem: &str, ext: &str) -> Result<PathBuf> {
    let dir = results_dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create results directory: {}", dir.display()))?;
    Ok(dir.join(format!("{}.{}", stem, ext)))
}

fn price_cell(price: Option<f64>) -> String {
    price.map(|p| p.to_string()).unwrap_or_default()
}

/// One row per order with its final state. `outcome` is blank until closed.
pub fn write_orders_csv(path: impl AsRef<Path>, orders: &[Order]) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    wtr.write_record([
        "id",
        "side",
        "created",
        "entry",
        "stop_loss",
        "take_profit",
        "status",
        "outcome",
        "pnl",
        "updated",
    ])?;

    for order in orders {
        let outcome = if order.is_closed() {
            order.outcome().to_string()
        } else {
            String::new()
        };
        wtr.write_record(&[
            order.id().to_string(),
            order.side().to_string(),
            order.order_date().format(TIME_FORMAT).to_string(),
            order.entry().to_string(),
            price_cell(order.stop_loss()),
            price_cell(order.take_profit()),
            order.status().to_string(),
            outcome,
            order.pnl().to_string(),
            order.last_update().format(TIME_FORMAT).to_string(),
        ])?;
    }

    wtr.flush()?;
    info!("Wrote {} orders to {}", orders.len(), path.display());
    Ok(())
}

/// Labelled equity curves joined on time; only times present in every curve
/// are written. Columns: `time,pnl_{label}...`
pub fn write_equity_csv(path: impl AsRef<Path>, curves: &[(String, Vec<EquityPoint>)]) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = vec!["time".to_string()];
    header.extend(curves.iter().map(|(label, _)| format!("pnl_{}", label)));
    wtr.write_record(&header)?;

    let lookups: Vec<HashMap<_, f64>> = curves
        .iter()
        .map(|(_, curve)| curve.iter().copied().collect())
        .collect();

    let mut rows = 0;
    if let Some((_, first)) = curves.first() {
        for (time, _) in first {
            let values: Option<Vec<f64>> = lookups.iter().map(|m| m.get(time).copied()).collect();
            let Some(values) = values else {
                continue;
            };

            let mut record = vec![time.format(TIME_FORMAT).to_string()];
            record.extend(values.iter().map(|v| v.to_string()));
            wtr.write_record(&record)?;
            rows += 1;
        }
    }

    wtr.flush()?;
    info!(
        "Wrote {} equity rows ({} curves) to {}",
        rows,
        curves.len(),
        path.display()
    );
    Ok(())
}

pub fn write_stats_json(path: impl AsRef<Path>, stats: &PerformanceStats) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(stats).context("Failed to serialize stats")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote stats to {}", path.display());
    Ok(())
}
