//! Signal generators
//!
//! A signal generator turns a price series into a batch of orders (pending
//! or already filled) for the backtester to drive through their lifecycle.

pub mod london_breakout;
pub mod ma_trend;

use crate::config::StrategyConfig;
use crate::{Candle, Order};

/// Produces orders from a price series
pub trait SignalGenerator: Send + Sync {
    /// Strategy identifier (matches the config's `strategy.name`)
    fn name(&self) -> &'static str;

    /// Build a fresh order collection for `candles`
    fn generate_orders(&self, candles: &[Candle]) -> Vec<Order>;
}

/// Create the signal generator selected in the config
pub fn create_generator(config: &StrategyConfig) -> Box<dyn SignalGenerator> {
    match config {
        StrategyConfig::MaTrend(c) => Box::new(ma_trend::MaTrendStrategy::new(c.clone())),
        StrategyConfig::LondonBreakout(c) => {
            Box::new(london_breakout::LondonBreakoutStrategy::new(c.clone()))
        }
    }
}

/// Copy of `config` with its swept parameter set to `value` (in pips)
pub fn with_sweep_value(config: &StrategyConfig, value: f64, pip_scale: f64) -> StrategyConfig {
    match config {
        StrategyConfig::MaTrend(c) => StrategyConfig::MaTrend(ma_trend::MaTrendConfig {
            target_distance: value / pip_scale,
            ..c.clone()
        }),
        StrategyConfig::LondonBreakout(c) => {
            StrategyConfig::LondonBreakout(london_breakout::LondonBreakoutConfig {
                tp_adjustment: value / pip_scale,
                ..c.clone()
            })
        }
    }
}
