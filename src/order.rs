//! Order state machine
//!
//! An [`Order`] carries one trade intent through its lifecycle:
//!
//! ```text
//! PENDING ──fill──▶ FILLED ──close_with_win / close_with_loss──▶ CLOSED
//!    │
//!    └──cancel──▶ CANCELLED
//! ```
//!
//! Orders may also be constructed already FILLED (market-fill semantics).
//! CANCELLED and CLOSED are terminal. Fields are private so the only way to
//! change state is through the transition methods below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Order ID type
pub type OrderId = u64;

/// Atomic counter for order ID generation
static ORDER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate next order ID (thread-safe, lock-free)
///
/// IDs are only used for reporting; no computed result depends on them.
pub fn next_order_id() -> OrderId {
    ORDER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Default position size: one standard lot
pub const STANDARD_LOT_UNITS: f64 = 100_000.0;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Long,
    Short,
}

impl OrderSide {
    /// +1 for long, -1 for short
    pub fn direction(self) -> f64 {
        match self {
            OrderSide::Long => 1.0,
            OrderSide::Short => -1.0,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Long => write!(f, "long"),
            OrderSide::Short => write!(f, "short"),
        }
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Closed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// Result of a trade, derived from the sign of its realized P&L
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Tie => write!(f, "tie"),
        }
    }
}

/// One trade intent and its lifecycle.
///
/// Only constructible through [`Order::new`] / [`Order::filled`] and mutated
/// only through the transition methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    order_date: DateTime<Utc>,
    side: OrderSide,
    entry: f64,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
    /// Realized P&L in price units, set only at close
    pnl: f64,
    status: OrderStatus,
    last_update: DateTime<Utc>,
    units: f64,
}

impl Order {
    /// Create a resting (PENDING) order
    pub fn new(order_date: DateTime<Utc>, side: OrderSide, entry: f64) -> Self {
        Self {
            id: next_order_id(),
            order_date,
            side,
            entry,
            stop_loss: None,
            take_profit: None,
            pnl: 0.0,
            status: OrderStatus::Pending,
            last_update: order_date,
            units: STANDARD_LOT_UNITS,
        }
    }

    /// Create an order that is already FILLED at `entry` (market fill)
    pub fn filled(order_date: DateTime<Utc>, side: OrderSide, entry: f64) -> Self {
        Self {
            status: OrderStatus::Filled,
            ..Self::new(order_date, side, entry)
        }
    }

    pub fn with_stop_loss(mut self, stop_loss: f64) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    pub fn with_take_profit(mut self, take_profit: f64) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    pub fn with_units(mut self, units: f64) -> Self {
        self.units = units;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn entry(&self) -> f64 {
        self.entry
    }

    pub fn stop_loss(&self) -> Option<f64> {
        self.stop_loss
    }

    pub fn take_profit(&self) -> Option<f64> {
        self.take_profit
    }

    pub fn pnl(&self) -> f64 {
        self.pnl
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn units(&self) -> f64 {
        self.units
    }

    pub fn is_long(&self) -> bool {
        self.side == OrderSide::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == OrderSide::Short
    }

    /// PENDING or FILLED
    pub fn is_open(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Filled)
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    pub fn is_closed(&self) -> bool {
        self.status == OrderStatus::Closed
    }

    pub fn outcome(&self) -> Outcome {
        if self.pnl > 0.0 {
            Outcome::Win
        } else if self.pnl < 0.0 {
            Outcome::Loss
        } else {
            Outcome::Tie
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// PENDING → FILLED. `filled_price` overrides the resting entry (gap fills).
    pub fn fill(&mut self, at: DateTime<Utc>, filled_price: Option<f64>) {
        debug_assert!(self.is_pending(), "fill() on a {} order", self.status);
        if let Some(price) = filled_price {
            self.entry = price;
        }
        self.status = OrderStatus::Filled;
        self.touch(at);
    }

    /// PENDING → CANCELLED
    pub fn cancel(&mut self, at: DateTime<Utc>) {
        debug_assert!(self.is_pending(), "cancel() on a {} order", self.status);
        self.status = OrderStatus::Cancelled;
        self.touch(at);
    }

    /// FILLED → CLOSED at the take-profit level, or at `close_price` which
    /// then replaces the recorded take-profit.
    pub fn close_with_win(&mut self, at: DateTime<Utc>, close_price: Option<f64>) {
        if close_price.is_some() {
            self.take_profit = close_price;
        }
        debug_assert!(self.take_profit.is_some(), "close_with_win() without exit level");
        let exit = self.take_profit.unwrap_or(self.entry);
        self.close(at, exit);
    }

    /// FILLED → CLOSED at the stop-loss level, or at `close_price` which
    /// then replaces the recorded stop-loss.
    pub fn close_with_loss(&mut self, at: DateTime<Utc>, close_price: Option<f64>) {
        if close_price.is_some() {
            self.stop_loss = close_price;
        }
        debug_assert!(self.stop_loss.is_some(), "close_with_loss() without exit level");
        let exit = self.stop_loss.unwrap_or(self.entry);
        self.close(at, exit);
    }

    fn close(&mut self, at: DateTime<Utc>, exit_price: f64) {
        debug_assert!(self.is_filled(), "close() on a {} order", self.status);
        self.status = OrderStatus::Closed;
        self.touch(at);
        self.pnl = (exit_price - self.entry) * self.side.direction();
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        debug_assert!(at >= self.order_date, "transition before order date");
        self.last_update = at;
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}: {} {} {} units @ {}",
            self.id,
            self.order_date.format("%Y-%m-%d %H:%M:%S"),
            self.side,
            self.units,
            self.entry
        )?;
        if self.stop_loss.is_some() || self.take_profit.is_some() {
            write!(
                f,
                " with stop loss {} / take profit {}",
                fmt_level(self.stop_loss),
                fmt_level(self.take_profit)
            )?;
        }
        write!(
            f,
            ". Status is {} with pnl {}. Last updated @ {}>",
            self.status,
            self.pnl,
            self.last_update.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

fn fmt_level(level: Option<f64>) -> String {
    level.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 8, 3, 8, 0, 0).unwrap()
    }

    fn long_order() -> Order {
        Order::new(t0(), OrderSide::Long, 1.3050)
            .with_stop_loss(1.3000)
            .with_take_profit(1.3150)
    }

    #[test]
    fn test_new_order_defaults() {
        let order = long_order();
        assert!(order.is_pending());
        assert!(order.is_open());
        assert_eq!(order.pnl(), 0.0);
        assert_eq!(order.last_update(), order.order_date());
        assert_eq!(order.units(), STANDARD_LOT_UNITS);
        assert_eq!(order.outcome(), Outcome::Tie);
    }

    #[test]
    fn test_ids_are_distinct() {
        let a = long_order();
        let b = long_order();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_fill_keeps_entry_without_price() {
        let mut order = long_order();
        let at = t0() + Duration::hours(1);
        order.fill(at, None);
        assert!(order.is_filled());
        assert!(order.is_open());
        assert_eq!(order.entry(), 1.3050);
        assert_eq!(order.last_update(), at);
        assert_eq!(order.pnl(), 0.0);
    }

    #[test]
    fn test_fill_overrides_entry_on_gap() {
        let mut order = long_order();
        order.fill(t0() + Duration::hours(1), Some(1.3062));
        assert_eq!(order.entry(), 1.3062);
    }

    #[test]
    fn test_cancel_pending() {
        let mut order = long_order();
        let at = t0() + Duration::days(1);
        order.cancel(at);
        assert!(order.is_cancelled());
        assert!(!order.is_open());
        assert_eq!(order.pnl(), 0.0);
        assert_eq!(order.last_update(), at);
    }

    #[test]
    fn test_long_close_with_win_at_target() {
        let mut order = long_order();
        order.fill(t0(), None);
        order.close_with_win(t0() + Duration::hours(2), None);
        assert!(order.is_closed());
        assert_relative_eq!(order.pnl(), 1.3150 - 1.3050, epsilon = 1e-12);
        assert_eq!(order.outcome(), Outcome::Win);
    }

    #[test]
    fn test_long_close_with_loss_at_stop() {
        let mut order = long_order();
        order.fill(t0(), None);
        order.close_with_loss(t0() + Duration::hours(2), None);
        assert_relative_eq!(order.pnl(), 1.3000 - 1.3050, epsilon = 1e-12);
        assert_eq!(order.outcome(), Outcome::Loss);
    }

    #[test]
    fn test_short_pnl_sign_is_negated() {
        let mut order = Order::filled(t0(), OrderSide::Short, 1.3050)
            .with_stop_loss(1.3100)
            .with_take_profit(1.2950);
        order.close_with_win(t0() + Duration::hours(1), None);
        assert_relative_eq!(order.pnl(), 1.3050 - 1.2950, epsilon = 1e-12);

        let mut order = Order::filled(t0(), OrderSide::Short, 1.3050)
            .with_stop_loss(1.3100)
            .with_take_profit(1.2950);
        order.close_with_loss(t0() + Duration::hours(1), None);
        assert_relative_eq!(order.pnl(), 1.3050 - 1.3100, epsilon = 1e-12);
        assert_eq!(order.outcome(), Outcome::Loss);
    }

    #[test]
    fn test_close_price_overwrites_exit_level() {
        let mut order = long_order();
        order.fill(t0(), None);
        order.close_with_loss(t0() + Duration::hours(1), Some(1.2990));
        assert_eq!(order.stop_loss(), Some(1.2990));
        assert_eq!(order.entry(), 1.3050);
        assert_relative_eq!(order.pnl(), 1.2990 - 1.3050, epsilon = 1e-12);

        let mut order = long_order();
        order.fill(t0(), None);
        order.close_with_win(t0() + Duration::hours(1), Some(1.3170));
        assert_eq!(order.take_profit(), Some(1.3170));
        assert_relative_eq!(order.pnl(), 1.3170 - 1.3050, epsilon = 1e-12);
    }

    #[test]
    fn test_exit_at_entry_is_a_tie() {
        let mut order = Order::filled(t0(), OrderSide::Long, 1.2).with_take_profit(1.2);
        order.close_with_win(t0(), None);
        assert!(order.is_closed());
        assert_eq!(order.outcome(), Outcome::Tie);
    }

    #[test]
    fn test_display_mentions_levels() {
        let text = long_order().to_string();
        assert!(text.contains("long"));
        assert!(text.contains("stop loss 1.3"));
        assert!(text.contains("Status is pending"));
    }

    #[test]
    fn test_only_closed_orders_carry_pnl() {
        let mut order = long_order();
        assert!(order.is_pending());
        assert_eq!(order.pnl(), 0.0);
        assert_eq!(order.outcome(), Outcome::Tie);
        assert_eq!(order.last_update(), order.order_date());

        order.fill(t0() + Duration::hours(1), Some(1.3060));
        assert!(order.is_filled());
        assert_eq!(order.pnl(), 0.0);
        assert!(order.last_update() >= order.order_date());

        order.close_with_loss(t0() + Duration::hours(2), None);
        assert!(order.is_closed());
        assert!(order.pnl() < 0.0);
        assert_eq!(order.last_update(), t0() + Duration::hours(2));
    }

    #[test]
    fn test_serde_lowercase_enums() {
        assert_eq!(serde_json::to_string(&OrderSide::Short).unwrap(), "\"short\"");
        assert_eq!(serde_json::to_string(&OrderStatus::Cancelled).unwrap(), "\"cancelled\"");
    }
}
