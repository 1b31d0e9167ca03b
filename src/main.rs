//! FX backtester - main entry point
//!
//! This binary provides three subcommands:
//! - backtest: Run a strategy over a price series and report its statistics
//! - sweep: Run one backtest per parameter value, in parallel
//! - import: Load a CSV price series into the SQLite candle store

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "fx-backtester")]
#[command(about = "FX order-lifecycle backtesting and parameter sweeps", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run strategy backtest
    Backtest {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/gbp_usd_london_breakout.json")]
        config: String,

        /// Initial cash (overrides config file)
        #[arg(long)]
        cash: Option<f64>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Read candles from this SQLite store (table named after the instrument)
        #[arg(long)]
        db: Option<String>,

        /// Write orders CSV, equity CSV and stats JSON into the results directory
        #[arg(long)]
        export: bool,

        /// Submit orders still pending at the end of the run to a paper gateway
        #[arg(long)]
        paper: bool,

        /// Fraction of equity risked per paper order
        #[arg(long, default_value = "0.02")]
        risk: f64,
    },

    /// Run one backtest per parameter value
    Sweep {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/gbp_usd_london_breakout.json")]
        config: String,

        /// Values to sweep in pips (comma-separated, overrides config). E.g., "0,5,10"
        #[arg(long)]
        values: Option<String>,

        /// Sort results by metric (pips, expectancy, win_rate, equity)
        #[arg(long, default_value = "pips")]
        sort_by: String,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,

        /// Read candles from this SQLite store instead of CSV
        #[arg(long)]
        db: Option<String>,
    },

    /// Import a CSV price series into SQLite
    Import {
        /// CSV file with time,open,high,low,close columns
        #[arg(long)]
        csv: String,

        /// SQLite database path
        #[arg(long, default_value = "data/prices.db")]
        db: String,

        /// Table name, e.g. GBP_USD
        #[arg(long)]
        table: String,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if file_only {
        // Sweep: keep the console clean for the progress bar
        let file_appender = tracing_appender::rolling::never("logs", &log_filename);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(true);

        let file_appender = tracing_appender::rolling::never("logs", &log_filename);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Backtest { .. } => ("backtest", false),
        Commands::Sweep { .. } => ("sweep", true),
        Commands::Import { .. } => ("import", false),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Backtest {
            config,
            cash,
            start,
            end,
            db,
            export,
            paper,
            risk,
        } => commands::backtest::run(commands::backtest::BacktestArgs {
            config_path: config,
            cash,
            start,
            end,
            db,
            export,
            paper,
            risk,
        }),

        Commands::Sweep {
            config,
            values,
            sort_by,
            sequential,
            db,
        } => commands::sweep::run(config, values, sort_by, sequential, db),

        Commands::Import { csv, db, table } => commands::import::run(csv, db, table),
    }
}
