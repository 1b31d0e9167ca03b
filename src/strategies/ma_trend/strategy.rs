//! Moving-Average Trend Strategy
//!
//! Long when `open < SMA(fast) < close` and the whole bar sits above
//! `SMA(slow)`; short on the mirror image. Orders are created already filled
//! at the close with fixed stop/target distances.

use tracing::debug;

use super::config::MaTrendConfig;
use crate::indicators::sma;
use crate::strategies::SignalGenerator;
use crate::{Candle, Order, OrderSide};

pub struct MaTrendStrategy {
    config: MaTrendConfig,
}

impl MaTrendStrategy {
    pub fn new(config: MaTrendConfig) -> Self {
        MaTrendStrategy { config }
    }

    fn entry_side(candle: &Candle, fast: f64, slow: f64) -> Option<OrderSide> {
        if candle.open < fast && fast < candle.close && candle.low > slow {
            Some(OrderSide::Long)
        } else if candle.close < fast && fast < candle.open && candle.high < slow {
            Some(OrderSide::Short)
        } else {
            None
        }
    }
}

impl SignalGenerator for MaTrendStrategy {
    fn name(&self) -> &'static str {
        "ma_trend"
    }

    fn generate_orders(&self, candles: &[Candle]) -> Vec<Order> {
        let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let fast = sma(&close, self.config.fast);
        let slow = sma(&close, self.config.slow);

        let orders: Vec<Order> = candles
            .iter()
            .zip(fast.iter().zip(slow.iter()))
            .filter_map(|(candle, (fast, slow))| {
                let side = Self::entry_side(candle, (*fast)?, (*slow)?)?;
                let direction = side.direction();
                Some(
                    Order::filled(candle.time, side, candle.close)
                        .with_stop_loss(candle.close - direction * self.config.stop_distance)
                        .with_take_profit(candle.close + direction * self.config.target_distance),
                )
            })
            .collect();

        debug!("{} orders created by {}", orders.len(), self.name());
        orders
    }
}
