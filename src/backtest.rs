//! Backtesting engine
//!
//! Bar-by-bar order-lifecycle simulation. For each bar, every open order whose
//! last transition is not in the future is checked for a fill (pending orders)
//! and then for an exit (filled orders). After all orders are processed the
//! realized P&L is marked into the equity curve.
//!
//! Price comparisons are asymmetric: entries fill on a strict break of the
//! entry level, stops trigger inclusively, targets on a strict break. When stop and target are both hit
//! inside one bar the stop wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BacktestConfig;
use crate::{Candle, Order, OrderSide};

/// Whether an order filled on a bar may also exit on that same bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameBarExit {
    /// Fill and exit may happen on the same bar
    #[default]
    Allow,
    /// Exit checks start on the bar after the fill
    Defer,
}

/// Which protective level closed a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

/// True when the bar trades through a pending order's entry level
pub fn fill_triggered(order: &Order, candle: &Candle) -> bool {
    match order.side() {
        OrderSide::Long => candle.high > order.entry(),
        OrderSide::Short => candle.low < order.entry(),
    }
}

/// Exit triggered by the bar for a filled order, stop-loss first.
/// Missing levels never trigger.
pub fn exit_triggered(order: &Order, candle: &Candle) -> Option<ExitReason> {
    let (stop_hit, target_hit) = match order.side() {
        OrderSide::Long => (
            order.stop_loss().is_some_and(|sl| candle.low <= sl),
            order.take_profit().is_some_and(|tp| candle.high > tp),
        ),
        OrderSide::Short => (
            order.stop_loss().is_some_and(|sl| candle.high >= sl),
            order.take_profit().is_some_and(|tp| candle.low < tp),
        ),
    };

    if stop_hit {
        Some(ExitReason::StopLoss)
    } else if target_hit {
        Some(ExitReason::TakeProfit)
    } else {
        None
    }
}

/// Backtest engine
///
/// Holds only plain value parameters; the order collection is borrowed
/// exclusively for the duration of one [`Backtester::run`].
#[derive(Debug, Clone)]
pub struct Backtester {
    lot_size: f64,
    initial_cash: f64,
    same_bar_exit: SameBarExit,
}

impl Backtester {
    pub fn new(lot_size: f64, initial_cash: f64) -> Self {
        Backtester {
            lot_size,
            initial_cash,
            same_bar_exit: SameBarExit::Allow,
        }
    }

    pub fn from_config(config: &BacktestConfig) -> Self {
        Backtester::new(config.lot_size, config.initial_cash).with_same_bar_exit(config.same_bar_exit)
    }

    pub fn with_same_bar_exit(mut self, same_bar_exit: SameBarExit) -> Self {
        self.same_bar_exit = same_bar_exit;
        self
    }

    pub fn lot_size(&self) -> f64 {
        self.lot_size
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    /// Simulate `orders` against `candles` (ascending, unique times).
    ///
    /// Orders are mutated in place and end up holding their final states.
    pub fn run(&self, candles: &[Candle], orders: &mut [Order]) -> BacktestResult {
        let mut equity_curve = Vec::with_capacity(candles.len());

        for candle in candles {
            let time = candle.time;

            for order in orders.iter_mut() {
                if !order.is_open() || time < order.last_update() {
                    continue;
                }

                let mut filled_this_bar = false;
                if order.is_pending() && fill_triggered(order, candle) {
                    order.fill(time, None);
                    filled_this_bar = true;
                    debug!(
                        "{} FILLED #{} {} @ {:.5}",
                        time.format("%Y-%m-%d %H:%M"),
                        order.id(),
                        order.side(),
                        order.entry()
                    );
                }

                if !order.is_filled() || (filled_this_bar && self.same_bar_exit == SameBarExit::Defer) {
                    continue;
                }

                match exit_triggered(order, candle) {
                    Some(ExitReason::StopLoss) => {
                        order.close_with_loss(time, None);
                        debug!(
                            "{} STOP LOSS #{} {}: PnL={:.5}",
                            time.format("%Y-%m-%d %H:%M"),
                            order.id(),
                            order.side(),
                            order.pnl()
                        );
                    }
                    Some(ExitReason::TakeProfit) => {
                        order.close_with_win(time, None);
                        debug!(
                            "{} TAKE PROFIT #{} {}: PnL={:.5}",
                            time.format("%Y-%m-%d %H:%M"),
                            order.id(),
                            order.side(),
                            order.pnl()
                        );
                    }
                    None => {}
                }
            }

            // Realized P&L only; open positions contribute nothing until closed
            let realized: f64 = orders.iter().map(Order::pnl).sum();
            equity_curve.push((time, realized * self.lot_size + self.initial_cash));
        }

        let closed = orders.iter().filter(|o| o.is_closed()).count();
        let open = orders.iter().filter(|o| o.is_open()).count();
        info!(
            "Backtest finished: {} bars, {} orders, {} closed, {} still open",
            candles.len(),
            orders.len(),
            closed,
            open
        );

        BacktestResult { equity_curve }
    }
}

/// Account value after a bar
pub type EquityPoint = (DateTime<Utc>, f64);

/// Output of one simulation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestResult {
    /// Mark-to-market account value after each bar
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestResult {
    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().map(|(_, equity)| *equity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Outcome;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i)
    }

    fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new_unchecked(t(i), open, high, low, close)
    }

    fn engine() -> Backtester {
        Backtester::new(100_000.0, 10_000.0)
    }

    #[test]
    fn test_pending_long_fills_then_stops_on_same_bar() {
        let candles = vec![bar(0, 1.0, 1.0, 1.0, 1.0), bar(1, 1.0, 1.06, 1.0, 1.03)];
        let mut orders = vec![Order::new(t(0), OrderSide::Long, 1.05)
            .with_stop_loss(1.0)
            .with_take_profit(1.10)];

        let result = engine().run(&candles, &mut orders);

        assert!(orders[0].is_closed());
        assert_eq!(orders[0].last_update(), t(1));
        assert_relative_eq!(orders[0].pnl(), 1.0 - 1.05, epsilon = 1e-12);
        assert_eq!(result.equity_curve.len(), 2);
        assert_eq!(result.equity_curve[0], (t(0), 10_000.0));
        assert_relative_eq!(result.equity_curve[1].1, -0.05 * 100_000.0 + 10_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_defer_keeps_fill_bar_free_of_exits() {
        let candles = vec![
            bar(0, 1.0, 1.0, 1.0, 1.0),
            bar(1, 1.0, 1.06, 1.0, 1.03),
            bar(2, 1.03, 1.04, 1.02, 1.03),
        ];
        let mut orders = vec![Order::new(t(0), OrderSide::Long, 1.05)
            .with_stop_loss(1.0)
            .with_take_profit(1.10)];

        let result = engine()
            .with_same_bar_exit(SameBarExit::Defer)
            .run(&candles[..2], &mut orders);
        assert!(orders[0].is_filled());
        assert_eq!(orders[0].pnl(), 0.0);
        assert_eq!(result.final_equity(), Some(10_000.0));

        // Next bar does not touch either level
        let mut orders = vec![Order::new(t(0), OrderSide::Long, 1.05)
            .with_stop_loss(1.0)
            .with_take_profit(1.10)];
        engine()
            .with_same_bar_exit(SameBarExit::Defer)
            .run(&candles, &mut orders);
        assert!(orders[0].is_filled());
    }

    #[test]
    fn test_defer_exits_on_bar_after_fill() {
        let candles = vec![
            bar(0, 1.0, 1.0, 1.0, 1.0),
            bar(1, 1.0, 1.06, 1.0, 1.03),
            bar(2, 1.03, 1.04, 0.99, 1.0),
        ];
        let mut orders = vec![Order::new(t(0), OrderSide::Long, 1.05)
            .with_stop_loss(1.0)
            .with_take_profit(1.10)];

        let result = engine()
            .with_same_bar_exit(SameBarExit::Defer)
            .run(&candles, &mut orders);

        assert!(orders[0].is_closed());
        assert_eq!(orders[0].outcome(), Outcome::Loss);
        assert_eq!(orders[0].last_update(), t(2));
        assert_relative_eq!(orders[0].pnl(), 1.0 - 1.05, epsilon = 1e-12);
        assert_eq!(result.equity_curve[1], (t(1), 10_000.0));
        assert_relative_eq!(result.equity_curve[2].1, -0.05 * 100_000.0 + 10_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_entry_equal_to_high_does_not_fill() {
        let candles = vec![bar(0, 1.04, 1.05, 1.03, 1.04)];
        let mut orders = vec![Order::new(t(0), OrderSide::Long, 1.05)];
        engine().run(&candles, &mut orders);
        assert!(orders[0].is_pending());

        let mut orders = vec![Order::new(t(0), OrderSide::Short, 1.03)];
        engine().run(&candles, &mut orders);
        assert!(orders[0].is_pending());
    }

    #[test]
    fn test_stop_is_inclusive_target_is_exclusive() {
        let candles = vec![bar(0, 1.02, 1.03, 1.00, 1.02)];

        let mut orders = vec![Order::filled(t(0), OrderSide::Long, 1.02).with_stop_loss(1.00)];
        engine().run(&candles, &mut orders);
        assert!(orders[0].is_closed());
        assert_relative_eq!(orders[0].pnl(), -0.02, epsilon = 1e-12);

        let mut orders = vec![Order::filled(t(0), OrderSide::Long, 1.02).with_take_profit(1.03)];
        engine().run(&candles, &mut orders);
        assert!(orders[0].is_filled());

        let mut orders = vec![Order::filled(t(0), OrderSide::Short, 1.02).with_stop_loss(1.03)];
        engine().run(&candles, &mut orders);
        assert!(orders[0].is_closed());
        assert_relative_eq!(orders[0].pnl(), -0.01, epsilon = 1e-12);

        let mut orders = vec![Order::filled(t(0), OrderSide::Short, 1.02).with_take_profit(1.00)];
        engine().run(&candles, &mut orders);
        assert!(orders[0].is_filled());
    }

    #[test]
    fn test_stop_wins_when_both_levels_hit() {
        let candles = vec![bar(0, 1.20, 1.30, 1.10, 1.20)];

        let mut orders = vec![Order::filled(t(0), OrderSide::Long, 1.20)
            .with_stop_loss(1.15)
            .with_take_profit(1.25)];
        engine().run(&candles, &mut orders);
        assert_relative_eq!(orders[0].pnl(), 1.15 - 1.20, epsilon = 1e-12);

        let mut orders = vec![Order::filled(t(0), OrderSide::Short, 1.20)
            .with_stop_loss(1.25)
            .with_take_profit(1.15)];
        engine().run(&candles, &mut orders);
        assert_relative_eq!(orders[0].pnl(), 1.20 - 1.25, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_levels_never_close() {
        let candles = vec![bar(0, 1.0, 2.0, 0.5, 1.0), bar(1, 1.0, 3.0, 0.1, 1.0)];
        let mut orders = vec![
            Order::filled(t(0), OrderSide::Long, 1.0),
            Order::filled(t(0), OrderSide::Short, 1.0),
        ];
        let result = engine().run(&candles, &mut orders);
        assert!(orders.iter().all(|o| o.is_filled() && o.pnl() == 0.0));
        assert!(result.equity_curve.iter().all(|(_, e)| *e == 10_000.0));
    }

    #[test]
    fn test_orders_are_not_touched_before_their_last_update() {
        let candles = vec![bar(0, 1.0, 1.2, 0.8, 1.0), bar(1, 1.0, 1.01, 0.99, 1.0)];
        // Created on bar 1, so bar 0's wide range must be ignored
        let mut orders = vec![Order::filled(t(1), OrderSide::Long, 1.0)
            .with_stop_loss(0.9)
            .with_take_profit(1.1)];
        engine().run(&candles, &mut orders);
        assert!(orders[0].is_filled());
    }

    #[test]
    fn test_terminal_orders_are_skipped() {
        let candles = vec![bar(0, 1.0, 1.2, 0.8, 1.0)];
        let mut cancelled = Order::new(t(0), OrderSide::Long, 1.05);
        cancelled.cancel(t(0));
        let mut orders = vec![cancelled];
        engine().run(&candles, &mut orders);
        assert!(orders[0].is_cancelled());
    }

    #[test]
    fn test_equity_marks_realized_pnl_only() {
        let candles = vec![
            bar(0, 1.00, 1.01, 0.99, 1.00),
            bar(1, 1.00, 1.03, 1.00, 1.02),
            bar(2, 1.02, 1.02, 0.95, 0.96),
        ];
        let mut orders = vec![
            Order::filled(t(0), OrderSide::Long, 1.00).with_take_profit(1.02),
            Order::filled(t(0), OrderSide::Short, 1.00).with_stop_loss(1.05),
        ];
        let result = Backtester::new(1_000.0, 500.0).run(&candles, &mut orders);

        let equity: Vec<f64> = result.equity_curve.iter().map(|(_, e)| *e).collect();
        assert_relative_eq!(equity[0], 500.0);
        assert_relative_eq!(equity[1], 0.02 * 1_000.0 + 500.0, epsilon = 1e-9);
        assert_relative_eq!(equity[2], 0.02 * 1_000.0 + 500.0, epsilon = 1e-9);
        // Short stays open: its paper gain on bar 2 is not marked
        assert!(orders[1].is_filled());
    }

    #[test]
    fn test_empty_inputs() {
        let mut orders: Vec<Order> = Vec::new();
        let result = engine().run(&[], &mut orders);
        assert!(result.equity_curve.is_empty());
        assert_eq!(result.final_equity(), None);

        let candles = vec![bar(0, 1.0, 1.0, 1.0, 1.0)];
        let result = engine().run(&candles, &mut orders);
        assert_eq!(result.equity_curve, vec![(t(0), 10_000.0)]);
    }
}
