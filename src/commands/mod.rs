//! CLI subcommands

pub mod backtest;
pub mod import;
pub mod sweep;

use anyhow::Result;
use fx_backtester::data::{self, CsvDataSource, MarketDataSource};
use fx_backtester::store::CandleStore;
use fx_backtester::{Candle, Config};
use tracing::info;

/// Load the configured instrument's candles, from SQLite when `db` is given
/// and from `{data_dir}/{INSTRUMENT}.csv` otherwise
pub fn load_candles(config: &Config, db: Option<&str>) -> Result<Vec<Candle>> {
    let start = config
        .backtest
        .start_date
        .as_deref()
        .map(data::parse_date)
        .transpose()?;
    let end = config
        .backtest
        .end_date
        .as_deref()
        .map(data::parse_date)
        .transpose()?;

    let source: Box<dyn MarketDataSource> = match db {
        Some(path) => {
            info!("Loading {} from SQLite store {}", config.instrument, path);
            Box::new(CandleStore::open(path, config.instrument.as_str())?)
        }
        None => {
            info!("Loading {} from {}", config.instrument, config.backtest.data_dir);
            Box::new(CsvDataSource::new(&config.backtest.data_dir))
        }
    };

    let candles = source.candles(&config.instrument, start, end)?;
    if candles.is_empty() {
        anyhow::bail!("No candles loaded for {}", config.instrument);
    }
    Ok(candles)
}
