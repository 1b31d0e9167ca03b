//! Sweep command implementation with progress tracking

use anyhow::Result;
use fx_backtester::strategies::{create_generator, with_sweep_value};
use fx_backtester::sweep::{run_sweep, sort_results};
use fx_backtester::{report, Config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Parse comma-separated floats
fn parse_float_list(s: &str) -> Vec<f64> {
    s.split(',').filter_map(|x| x.trim().parse().ok()).collect()
}

pub fn run(
    config_path: String,
    values_override: Option<String>,
    sort_by: String,
    sequential: bool,
    db: Option<String>,
) -> Result<()> {
    let config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    let values = match values_override.as_deref() {
        Some(s) => parse_float_list(s),
        None => config
            .sweep
            .as_ref()
            .map(|s| s.values.clone())
            .unwrap_or_default(),
    };
    if values.is_empty() {
        anyhow::bail!("No sweep values: pass --values or set sweep.values in the config");
    }

    let candles = super::load_candles(&config, db.as_deref())?;
    let pip_scale = config.pip_scale();

    println!("\n{}", "=".repeat(70));
    println!("PARAMETER SWEEP");
    println!("{}", "=".repeat(70));
    println!("  Instrument:    {}", config.instrument);
    println!("  Strategy:      {}", config.strategy.name());
    println!("  Candles:       {}", candles.len());
    println!("  Values (pips): {:?}", values);
    println!(
        "  Mode:          {}",
        if sequential { "sequential" } else { "parallel" }
    );
    println!("{}\n", "=".repeat(70));

    let pb = ProgressBar::new(values.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}, {per_sec}] ✓ {msg}")?
            .progress_chars("█░ "),
    );
    pb.set_message("starting...");
    pb.tick();

    let build_orders = |value: f64| {
        let strategy = with_sweep_value(&config.strategy, value, pip_scale);
        create_generator(&strategy).generate_orders(&candles)
    };

    let mut results = run_sweep(
        &candles,
        &values,
        build_orders,
        &config.backtest,
        pip_scale,
        !sequential,
        &pb,
    );
    pb.finish_with_message(format!("{} runs", results.len()));
    println!();

    // Equity curves keep the input order of values
    let curves: Vec<(String, Vec<_>)> = results
        .iter()
        .map(|r| (r.value.to_string(), r.equity_curve.clone()))
        .collect();
    let path = report::results_path(
        &config.backtest.results_dir,
        &format!("{}_{}_sweep_equity", config.instrument, config.strategy.name()),
        "csv",
    )?;
    report::write_equity_csv(&path, &curves)?;

    sort_results(&mut results, &sort_by);
    info!("Sweep finished, sorted by: {}", sort_by);

    println!("\n{}", "=".repeat(90));
    println!("SWEEP RESULTS (sorted by {})", sort_by);
    println!("{}", "=".repeat(90));
    println!(
        "{:<4} {:>8} {:>7} {:>6} {:>6} {:>8} {:>10} {:>12} {:>8}",
        "Rank", "Value", "Orders", "Wins", "Losses", "WinR%", "Pips", "Equity", "MaxDD%"
    );
    println!("{}", "-".repeat(90));
    for (i, r) in results.iter().enumerate() {
        println!(
            "{:<4} {:>8.1} {:>7} {:>6} {:>6} {:>8.2} {:>10.1} {:>12.2} {:>8.2}",
            i + 1,
            r.value,
            r.stats.total_orders,
            r.stats.wins,
            r.stats.losses,
            r.stats.win_rate * 100.0,
            r.stats.total_pips,
            r.final_equity,
            r.max_drawdown * 100.0
        );
    }
    println!("{}", "=".repeat(90));
    println!("Equity curves written to {}", path.display());

    Ok(())
}
