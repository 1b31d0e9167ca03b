//! London Breakout Strategy Module
//!
//! Brackets the overnight range with resting stop orders at the London open.
//! Unfilled orders expire at the next session open.

pub mod config;
pub mod strategy;

pub use config::LondonBreakoutConfig;
pub use strategy::LondonBreakoutStrategy;
