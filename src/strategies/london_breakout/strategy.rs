//! London Breakout Strategy
//!
//! 1. Track the high and low of the last `range_bars` bars
//! 2. At the first bar of the session hour each day:
//!    - cancel every order that is still pending
//!    - buy stop at the range high (SL = range low, TP = high + range + adj)
//!    - sell stop at the range low (SL = range high, TP = low - range - adj)
//! 3. Pending orders fill as soon as a bar trades through their entry

use chrono::{NaiveDate, Timelike};
use tracing::{debug, info};

use super::config::LondonBreakoutConfig;
use crate::backtest::fill_triggered;
use crate::indicators::{rolling_max, rolling_min, wma};
use crate::strategies::SignalGenerator;
use crate::types::round_to;
use crate::{Candle, Order, OrderSide};

const TARGET_PRECISION: u32 = 5;

pub struct LondonBreakoutStrategy {
    config: LondonBreakoutConfig,
}

impl LondonBreakoutStrategy {
    pub fn new(config: LondonBreakoutConfig) -> Self {
        LondonBreakoutStrategy { config }
    }

    fn long_order(&self, candle: &Candle, high: f64, low: f64) -> Order {
        let target = round_to(high * 2.0 - low + self.config.tp_adjustment, TARGET_PRECISION);
        Order::new(candle.time, OrderSide::Long, high)
            .with_stop_loss(low)
            .with_take_profit(target)
    }

    fn short_order(&self, candle: &Candle, high: f64, low: f64) -> Order {
        let target = round_to(low * 2.0 - high - self.config.tp_adjustment, TARGET_PRECISION);
        Order::new(candle.time, OrderSide::Short, low)
            .with_stop_loss(high)
            .with_take_profit(target)
    }

    /// Sides allowed by the trend filter for this session bar
    fn allowed_sides(&self, candle: &Candle, trend: Option<f64>) -> (bool, bool) {
        if self.config.trend_filter.is_none() {
            return (true, true);
        }
        match trend {
            Some(wma) if candle.low >= wma => (true, false),
            Some(wma) if candle.high <= wma => (false, true),
            _ => (false, false),
        }
    }
}

impl SignalGenerator for LondonBreakoutStrategy {
    fn name(&self) -> &'static str {
        "london_breakout"
    }

    fn generate_orders(&self, candles: &[Candle]) -> Vec<Order> {
        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let range_high = rolling_max(&highs, self.config.range_bars);
        let range_low = rolling_min(&lows, self.config.range_bars);
        let trend = match self.config.trend_filter {
            Some(period) => {
                let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
                wma(&close, period)
            }
            None => vec![None; candles.len()],
        };

        let mut orders: Vec<Order> = Vec::new();
        let mut last_session: Option<NaiveDate> = None;

        for (i, candle) in candles.iter().enumerate() {
            let (Some(high), Some(low)) = (
                range_high.get(i).copied().flatten(),
                range_low.get(i).copied().flatten(),
            ) else {
                continue;
            };

            let date = candle.time.date_naive();
            if candle.time.hour() == self.config.session_hour && last_session != Some(date) {
                last_session = Some(date);

                let mut expired = 0;
                for order in orders.iter_mut().filter(|o| o.is_pending()) {
                    order.cancel(candle.time);
                    expired += 1;
                }

                let (go_long, go_short) = self.allowed_sides(candle, trend.get(i).copied().flatten());
                if go_long {
                    orders.push(self.long_order(candle, high, low));
                }
                if go_short {
                    orders.push(self.short_order(candle, high, low));
                }
                debug!(
                    "Session {}: range {:.5}-{:.5}, {} expired, long={} short={}",
                    date, low, high, expired, go_long, go_short
                );
            }

            for order in orders.iter_mut().filter(|o| o.is_pending()) {
                if fill_triggered(order, candle) {
                    order.fill(candle.time, None);
                }
            }
        }

        info!("{} orders created by {}", orders.len(), self.name());
        orders
    }
}
