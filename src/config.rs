//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files, with environment
//! variable overrides for paths and starting cash (a `.env` file is honoured
//! by the binary).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::backtest::SameBarExit;
use crate::strategies::london_breakout::LondonBreakoutConfig;
use crate::strategies::ma_trend::MaTrendConfig;
use crate::Instrument;

/// Semantic errors in an otherwise well-formed config file
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("instrument must not be empty")]
    EmptyInstrument,

    #[error("lot_size must be positive, got {0}")]
    NonPositiveLotSize(f64),

    #[error("pip_scale must be positive, got {0}")]
    NonPositivePipScale(f64),

    #[error("sweep.values must not be empty")]
    EmptySweep,

    #[error("FXBT_INITIAL_CASH is not a number: {0:?}")]
    InvalidInitialCash(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub instrument: Instrument,
    #[serde(default)]
    pub backtest: BacktestConfig,
    pub strategy: StrategyConfig,
    /// Parameter values for the sweep command (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep: Option<SweepConfig>,
}

impl Config {
    /// Load configuration from JSON file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Override paths and starting cash from `FXBT_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(dir) = std::env::var("FXBT_DATA_DIR") {
            self.backtest.data_dir = dir;
        }
        if let Ok(dir) = std::env::var("FXBT_RESULTS_DIR") {
            self.backtest.results_dir = dir;
        }
        if let Ok(cash) = std::env::var("FXBT_INITIAL_CASH") {
            self.set_initial_cash(&cash)?;
        }
        Ok(())
    }

    fn set_initial_cash(&mut self, raw: &str) -> Result<(), ConfigError> {
        let cash = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::InvalidInitialCash(raw.to_string()))?;
        self.backtest.initial_cash = cash;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument.as_str().is_empty() {
            return Err(ConfigError::EmptyInstrument);
        }
        if self.backtest.lot_size <= 0.0 {
            return Err(ConfigError::NonPositiveLotSize(self.backtest.lot_size));
        }
        if let Some(scale) = self.backtest.pip_scale {
            if scale <= 0.0 {
                return Err(ConfigError::NonPositivePipScale(scale));
            }
        }
        if let Some(sweep) = &self.sweep {
            if sweep.values.is_empty() {
                return Err(ConfigError::EmptySweep);
            }
        }
        Ok(())
    }

    /// Pip scale for stats: explicit setting, else the instrument convention
    pub fn pip_scale(&self) -> f64 {
        self.backtest
            .pip_scale
            .unwrap_or_else(|| self.instrument.pip_scale())
    }
}

/// Backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    /// Multiplier from price-unit P&L to account currency (1 standard lot = 100,000)
    #[serde(default = "default_lot_size")]
    pub lot_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pip_scale: Option<f64>,
    #[serde(default)]
    pub same_bar_exit: SameBarExit,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

fn default_initial_cash() -> f64 {
    10_000.0
}

fn default_lot_size() -> f64 {
    100_000.0
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_results_dir() -> String {
    "results".to_string()
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_cash: default_initial_cash(),
            lot_size: default_lot_size(),
            pip_scale: None,
            same_bar_exit: SameBarExit::Allow,
            data_dir: default_data_dir(),
            results_dir: default_results_dir(),
            start_date: None,
            end_date: None,
        }
    }
}

/// Signal generator selection, tagged by `name`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum StrategyConfig {
    MaTrend(MaTrendConfig),
    LondonBreakout(LondonBreakoutConfig),
}

impl StrategyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyConfig::MaTrend(_) => "ma_trend",
            StrategyConfig::LondonBreakout(_) => "london_breakout",
        }
    }
}

/// Values swept by the sweep command.
///
/// For `london_breakout` the values are take-profit adjustments in pips; for
/// `ma_trend` they are target distances in pips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub values: Vec<f64>,
}
