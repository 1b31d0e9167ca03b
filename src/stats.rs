//! Performance accounting over a finished order collection

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backtest::EquityPoint;
use crate::types::round_to;
use crate::{Order, OrderStatus, Outcome};

/// Aggregate statistics for one simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_orders: usize,
    pub buys: usize,
    pub sells: usize,
    pub closed: usize,
    pub cancelled: usize,
    pub wins: usize,
    pub losses: usize,
    /// Mean P&L of winning orders, in price units
    pub avg_win: f64,
    /// Mean P&L of losing orders, in price units (negative)
    pub avg_loss: f64,
    pub total_pips: f64,
    /// wins / (wins + losses), ties excluded
    pub win_rate: f64,
    pub win_loss_ratio: f64,
    /// win_rate * win_loss_ratio - (1 - win_rate), rounded to 4 decimals
    pub expectancy: f64,
    /// Price-unit to pip multiplier the record was computed with
    pub pip_scale: f64,
}

/// Compute statistics from the final state of `orders`.
///
/// Never fails: every ratio is zero-guarded and an empty collection yields
/// zero counts (with `expectancy == -1`).
pub fn compute_stats(orders: &[Order], pip_scale: f64) -> PerformanceStats {
    let mut stats = PerformanceStats {
        total_orders: orders.len(),
        pip_scale,
        ..Default::default()
    };

    let mut win_sum = 0.0;
    let mut loss_sum = 0.0;
    let mut pnl_sum = 0.0;

    for order in orders {
        if order.is_long() {
            stats.buys += 1;
        } else {
            stats.sells += 1;
        }

        match order.status() {
            OrderStatus::Closed => stats.closed += 1,
            OrderStatus::Cancelled => stats.cancelled += 1,
            OrderStatus::Pending | OrderStatus::Filled => {}
        }

        match order.outcome() {
            Outcome::Win => {
                stats.wins += 1;
                win_sum += order.pnl();
            }
            Outcome::Loss => {
                stats.losses += 1;
                loss_sum += order.pnl();
            }
            Outcome::Tie => {}
        }

        pnl_sum += order.pnl();
    }

    if stats.wins > 0 {
        stats.avg_win = win_sum / stats.wins as f64;
    }
    if stats.losses > 0 {
        stats.avg_loss = loss_sum / stats.losses as f64;
    }

    stats.total_pips = pnl_sum * pip_scale;

    let decided = stats.wins + stats.losses;
    if decided > 0 {
        stats.win_rate = stats.wins as f64 / decided as f64;
    }

    if stats.avg_loss != 0.0 {
        stats.win_loss_ratio = (stats.avg_win / stats.avg_loss).abs();
    }

    stats.expectancy = round_to(
        stats.win_rate * stats.win_loss_ratio - (1.0 - stats.win_rate),
        4,
    );

    stats
}

/// Largest peak-to-trough decline of an equity curve, as a fraction of the peak
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0;

    for (_, equity) in equity_curve {
        if *equity > peak {
            peak = *equity;
        }
        if peak > 0.0 {
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

impl fmt::Display for PerformanceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Orders:       {}", self.total_orders)?;
        writeln!(f, "Buys:               {}", self.buys)?;
        writeln!(f, "Sells:              {}", self.sells)?;
        writeln!(f, "Closed:             {}", self.closed)?;
        writeln!(f, "Cancelled:          {}", self.cancelled)?;
        writeln!(f, "Wins:               {}", self.wins)?;
        writeln!(f, "Losses:             {}", self.losses)?;
        writeln!(f, "Average Win:        {:.2} pips", self.avg_win * self.pip_scale)?;
        writeln!(f, "Average Loss:       {:.2} pips", self.avg_loss * self.pip_scale)?;
        writeln!(f, "Win Rate:           {:.2}%", self.win_rate * 100.0)?;
        writeln!(f, "Win/Loss Ratio:     {:.2}", self.win_loss_ratio)?;
        writeln!(f, "Total P&L:          {:.4} pips", self.total_pips)?;
        write!(f, "Expectancy:         {:.4}", self.expectancy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderSide;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap() + Duration::hours(i)
    }

    fn closed(side: OrderSide, entry: f64, exit: f64) -> Order {
        let mut order = Order::filled(t(0), side, entry).with_take_profit(exit);
        order.close_with_win(t(1), None);
        order
    }

    #[test]
    fn test_empty_orders() {
        let stats = compute_stats(&[], 10_000.0);
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.losses, 0);
        assert_eq!(stats.avg_win, 0.0);
        assert_eq!(stats.avg_loss, 0.0);
        assert_eq!(stats.total_pips, 0.0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.win_loss_ratio, 0.0);
        assert_eq!(stats.expectancy, -1.0);
    }

    #[test]
    fn test_one_win_one_loss() {
        let orders = vec![
            closed(OrderSide::Long, 1.3000, 1.3020),
            closed(OrderSide::Short, 1.3000, 1.3010),
        ];
        let stats = compute_stats(&orders, 10_000.0);

        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.buys, 1);
        assert_eq!(stats.sells, 1);
        assert_eq!(stats.closed, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 1);
        assert_relative_eq!(stats.avg_win, 0.002, epsilon = 1e-9);
        assert_relative_eq!(stats.avg_loss, -0.001, epsilon = 1e-9);
        assert_relative_eq!(stats.total_pips, 10.0, epsilon = 1e-6);
        assert_relative_eq!(stats.win_rate, 0.5);
        assert_relative_eq!(stats.win_loss_ratio, 2.0, epsilon = 1e-6);
        assert_relative_eq!(stats.expectancy, 0.5);
    }

    #[test]
    fn test_ties_and_open_orders_excluded_from_outcomes() {
        let mut cancelled = Order::new(t(0), OrderSide::Short, 1.1);
        cancelled.cancel(t(1));
        let orders = vec![
            closed(OrderSide::Long, 1.2, 1.2),
            Order::new(t(0), OrderSide::Long, 1.1),
            Order::filled(t(0), OrderSide::Long, 1.1),
            cancelled,
        ];
        let stats = compute_stats(&orders, 10_000.0);

        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.buys, 3);
        assert_eq!(stats.sells, 1);
        assert_eq!(stats.closed, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.wins + stats.losses, 0);
        assert_eq!(stats.expectancy, -1.0);
    }

    #[test]
    fn test_only_wins_has_zero_ratio() {
        let orders = vec![closed(OrderSide::Long, 1.0, 1.01)];
        let stats = compute_stats(&orders, 10_000.0);
        assert_eq!(stats.win_rate, 1.0);
        assert_eq!(stats.win_loss_ratio, 0.0);
        assert_eq!(stats.expectancy, 0.0);
    }

    #[test]
    fn test_expectancy_is_rounded() {
        // 2 wins of 3 decided, ratio 1.5 -> 2/3 * 1.5 - 1/3 = 0.6666...
        let orders = vec![
            closed(OrderSide::Long, 1.0, 1.003),
            closed(OrderSide::Long, 1.0, 1.003),
            closed(OrderSide::Long, 1.0, 0.998),
        ];
        let stats = compute_stats(&orders, 10_000.0);
        assert_relative_eq!(stats.expectancy, 0.6667);
    }

    #[test]
    fn test_pip_scale_for_jpy() {
        let orders = vec![closed(OrderSide::Long, 150.00, 150.25)];
        let stats = compute_stats(&orders, 100.0);
        assert_relative_eq!(stats.total_pips, 25.0, epsilon = 1e-6);
    }

    #[test]
    fn test_max_drawdown() {
        let curve = vec![(t(0), 100.0), (t(1), 120.0), (t(2), 90.0), (t(3), 130.0)];
        assert_relative_eq!(max_drawdown(&curve), 0.25);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn test_display_reports_pips() {
        let orders = vec![closed(OrderSide::Long, 1.3000, 1.3020)];
        let text = compute_stats(&orders, 10_000.0).to_string();
        assert!(text.contains("Average Win:        20.00 pips"));
        assert!(text.contains("Win Rate:           100.00%"));
    }
}
