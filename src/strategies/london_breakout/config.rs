//! London Breakout Configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LondonBreakoutConfig {
    /// Bars making up the pre-session range (default: 8)
    pub range_bars: usize,

    /// UTC hour at which orders are placed and stale ones expire (default: 8)
    pub session_hour: u32,

    /// Added to the long target and subtracted from the short target, in price units
    pub tp_adjustment: f64,

    /// WMA period for the trend filter. Long only when the session bar's low
    /// is at or above the WMA, short only when its high is at or below it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_filter: Option<usize>,
}

impl Default for LondonBreakoutConfig {
    fn default() -> Self {
        Self {
            range_bars: 8,
            session_hour: 8,
            tp_adjustment: 0.0,
            trend_filter: None,
        }
    }
}
