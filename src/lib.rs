//! FX Backtester
//!
//! Order-lifecycle simulation and performance accounting for retail FX
//! strategies. Signal generators turn a candle series into orders, the
//! [`Backtester`] drives every order through its lifecycle bar by bar, and
//! [`compute_stats`] aggregates the finished trades.
//!
//! ```no_run
//! use fx_backtester::data::{CsvDataSource, MarketDataSource};
//! use fx_backtester::strategies::{create_generator, SignalGenerator};
//! use fx_backtester::{compute_stats, Backtester, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("configs/gbp_usd_london_breakout.json")?;
//!     let source = CsvDataSource::new(&config.backtest.data_dir);
//!     let candles = source.candles(&config.instrument, None, None)?;
//!
//!     let generator = create_generator(&config.strategy);
//!     let mut orders = generator.generate_orders(&candles);
//!     let result = Backtester::from_config(&config.backtest).run(&candles, &mut orders);
//!
//!     println!("{}", compute_stats(&orders, config.pip_scale()));
//!     println!("Final equity: {:?}", result.final_equity());
//!     Ok(())
//! }
//! ```

pub mod backtest;
pub mod config;
pub mod data;
pub mod gateway;
pub mod indicators;
pub mod order;
pub mod position;
pub mod report;
pub mod stats;
pub mod store;
pub mod strategies;
pub mod sweep;
pub mod types;

pub use backtest::{BacktestResult, Backtester, EquityPoint, SameBarExit};
pub use config::{BacktestConfig, Config, ConfigError};
pub use order::{Order, OrderId, OrderSide, OrderStatus, Outcome};
pub use stats::{compute_stats, PerformanceStats};
pub use types::*;
