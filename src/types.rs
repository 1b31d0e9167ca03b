//! Core data types used across the backtester

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for candle data
#[derive(Debug, Error, PartialEq)]
pub enum CandleValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// OHLC candlestick for one bar interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self::new_unchecked(time, open, high, low, close);
        candle.validate()?;
        Ok(candle)
    }

    /// Create a candle without validation (for trusted sources or synthetic test bars)
    pub fn new_unchecked(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }

    /// Validate the candle data
    pub fn validate(&self) -> Result<(), CandleValidationError> {
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(CandleValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.open < self.low || self.open > self.high {
            return Err(CandleValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(CandleValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// Check if the candle is valid without returning detailed error
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Instruments quoted to the second decimal place rather than the fourth
const TWO_DECIMAL_PIP_CODES: [&str; 3] = ["JPY", "XAU", "BCO"];

/// Currency pair or CFD code in broker notation, e.g. `GBP_USD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Instrument(String);

impl Instrument {
    pub fn new(code: impl AsRef<str>) -> Self {
        Instrument(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_two_decimal_pip(&self) -> bool {
        TWO_DECIMAL_PIP_CODES
            .iter()
            .any(|code| self.0.contains(code))
    }

    /// Price increment of one pip (0.01 for JPY/XAU/BCO, otherwise 0.0001)
    pub fn pip_size(&self) -> f64 {
        if self.is_two_decimal_pip() {
            0.01
        } else {
            0.0001
        }
    }

    /// Multiplier converting a price-unit move into pips
    pub fn pip_scale(&self) -> f64 {
        if self.is_two_decimal_pip() {
            100.0
        } else {
            10_000.0
        }
    }

    /// Decimal places accepted by the broker for prices on this instrument
    pub fn price_precision(&self) -> u32 {
        if self.is_two_decimal_pip() {
            3
        } else {
            5
        }
    }

    /// Round a price to the instrument's quote precision
    pub fn round_price(&self, price: f64) -> f64 {
        round_to(price, self.price_precision())
    }

    /// Quote currency (the part after the last `_`)
    pub fn quote_currency(&self) -> &str {
        self.0.rsplit('_').next().unwrap_or(&self.0)
    }
}

impl From<String> for Instrument {
    fn from(code: String) -> Self {
        Instrument::new(code)
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Round half away from zero to `dp` decimal places
pub fn round_to(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}
