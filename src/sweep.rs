//! Parameter sweeps
//!
//! Runs one independent simulation per parameter value. Each value gets its
//! own freshly generated order collection, so runs share nothing mutable and
//! parallel results match sequential ones exactly.

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::info;

use crate::backtest::{Backtester, EquityPoint};
use crate::config::BacktestConfig;
use crate::stats::{compute_stats, max_drawdown, PerformanceStats};
use crate::{Candle, Order};

/// Outcome of the simulation for one swept value
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub value: f64,
    pub stats: PerformanceStats,
    pub final_equity: f64,
    pub max_drawdown: f64,
    pub equity_curve: Vec<EquityPoint>,
}

fn simulate<F>(
    candles: &[Candle],
    value: f64,
    build_orders: &F,
    backtester: &Backtester,
    pip_scale: f64,
) -> SweepResult
where
    F: Fn(f64) -> Vec<Order>,
{
    let mut orders = build_orders(value);
    let result = backtester.run(candles, &mut orders);

    SweepResult {
        value,
        stats: compute_stats(&orders, pip_scale),
        final_equity: result.final_equity().unwrap_or(backtester.initial_cash()),
        max_drawdown: max_drawdown(&result.equity_curve),
        equity_curve: result.equity_curve,
    }
}

/// Simulate every value in `values`, in input order.
///
/// `build_orders` must produce a fresh order collection for a value.
pub fn run_sweep<F>(
    candles: &[Candle],
    values: &[f64],
    build_orders: F,
    backtest_config: &BacktestConfig,
    pip_scale: f64,
    parallel: bool,
    progress: &ProgressBar,
) -> Vec<SweepResult>
where
    F: Fn(f64) -> Vec<Order> + Send + Sync,
{
    let backtester = Backtester::from_config(backtest_config);

    info!(
        "Sweeping {} values over {} candles ({})",
        values.len(),
        candles.len(),
        if parallel { "parallel" } else { "sequential" }
    );

    let run_one = |value: &f64| {
        let result = simulate(candles, *value, &build_orders, &backtester, pip_scale);
        progress.inc(1);
        progress.set_message(format!("{} done", value));
        result
    };

    if parallel {
        values.par_iter().map(run_one).collect()
    } else {
        values.iter().map(run_one).collect()
    }
}

/// Sort results best-first by the given metric (`pips`, `expectancy`,
/// `win_rate` or `equity`; unknown names fall back to `pips`)
pub fn sort_results(results: &mut [SweepResult], sort_by: &str) {
    let key = |r: &SweepResult| match sort_by {
        "expectancy" => r.stats.expectancy,
        "win_rate" => r.stats.win_rate,
        "equity" => r.final_equity,
        _ => r.stats.total_pips,
    };
    results.sort_by(|a, b| key(b).total_cmp(&key(a)));
}
