//! Risk-based position sizing
//!
//! Sizes a position so that hitting the stop-loss costs a fixed fraction of
//! the account balance:
//! ```text
//! lots = (balance * risk_pct) / (sl_pips * pip_value) * quote_rate
//! pip_value = STANDARD_LOT_UNITS * pip_size
//! ```
//! `quote_rate` converts the instrument's quote currency into the account
//! currency (1.0 when they match). The result is in standard lots, rounded
//! to 4 decimal places.

use crate::order::STANDARD_LOT_UNITS;
use crate::types::round_to;
use crate::Instrument;

/// Standard lots to trade for the given risk budget.
///
/// Returns 0.0 for a non-positive stop distance.
pub fn position_size(
    balance: f64,
    risk_pct: f64,
    sl_pips: f64,
    instrument: &Instrument,
    quote_rate: f64,
) -> f64 {
    if sl_pips <= 0.0 {
        return 0.0;
    }
    let pip_value = STANDARD_LOT_UNITS * instrument.pip_size();
    let risk_amount = balance * risk_pct;
    round_to(risk_amount / (sl_pips * pip_value) * quote_rate, 4)
}

/// Conversion rate from the instrument's quote currency to `account_ccy`.
///
/// `market_rate` is the `{account_ccy}_{quote}` rate and is only used when
/// the currencies differ.
pub fn quote_rate(account_ccy: &str, instrument: &Instrument, market_rate: f64) -> f64 {
    if instrument.quote_currency().eq_ignore_ascii_case(account_ccy) {
        1.0
    } else {
        market_rate
    }
}
