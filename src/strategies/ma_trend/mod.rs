//! Moving-Average Trend Strategy Module
//!
//! Market-fill entries on candles that cross the fast average in the
//! direction of the slow-average trend.

pub mod config;
pub mod strategy;

pub use config::MaTrendConfig;
pub use strategy::MaTrendStrategy;
