//! Technical indicators powered by the `ta` crate
//!
//! Signal generators consume these as pre-computed columns. Every function
//! returns a vector aligned with its input, with `None` during warm-up.

use ta::indicators::{Maximum, Minimum, SimpleMovingAverage};
use ta::Next;

/// Feed `values` through a `ta` indicator, masking the first `period - 1` outputs
fn windowed<I>(values: &[f64], period: usize, mut indicator: I) -> Vec<Option<f64>>
where
    I: Next<f64, Output = f64>,
{
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let out = indicator.next(value);
            (i + 1 >= period).then_some(out)
        })
        .collect()
}

/// Calculate Simple Moving Average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    match SimpleMovingAverage::new(period) {
        Ok(indicator) => windowed(values, period, indicator),
        Err(_) => vec![None; values.len()],
    }
}

/// Highest value over the trailing `period` bars
pub fn rolling_max(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    match Maximum::new(period) {
        Ok(indicator) => windowed(values, period, indicator),
        Err(_) => vec![None; values.len()],
    }
}

/// Lowest value over the trailing `period` bars
pub fn rolling_min(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    match Minimum::new(period) {
        Ok(indicator) => windowed(values, period, indicator),
        Err(_) => vec![None; values.len()],
    }
}

/// Calculate Weighted Moving Average (manual implementation - not in ta crate)
pub fn wma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let weight_sum: f64 = (1..=period).map(|x| x as f64).sum();

    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let weighted_sum: f64 = values[i + 1 - period..=i]
                .iter()
                .enumerate()
                .map(|(j, &v)| v * (j + 1) as f64)
                .sum();
            Some(weighted_sum / weight_sum)
        })
        .collect()
}
