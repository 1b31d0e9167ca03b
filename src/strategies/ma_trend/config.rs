//! Moving-Average Trend Configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaTrendConfig {
    /// Fast SMA period the candle body must straddle (default: 12)
    pub fast: usize,

    /// Slow SMA period acting as trend filter (default: 50)
    pub slow: usize,

    /// Stop-loss distance from entry, in price units (default: 0.01)
    pub stop_distance: f64,

    /// Take-profit distance from entry, in price units (default: 0.02)
    pub target_distance: f64,
}

impl Default for MaTrendConfig {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 50,
            stop_distance: 0.01,
            target_distance: 0.02,
        }
    }
}
