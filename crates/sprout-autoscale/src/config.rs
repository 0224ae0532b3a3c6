//! Controller tuning read from the environment at startup.

use std::time::Duration;

use thiserror::Error;

/// An environment value that failed to parse. Fatal at startup: a
/// controller running with half-applied tuning is worse than one that
/// refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer value {value:?} for {name}")]
    InvalidInt {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("invalid float value {value:?} for {name}")]
    InvalidFloat {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}

/// Tuning knobs for the polling loop and the EMA window.
#[derive(Debug, Clone)]
pub struct Config {
    /// Window size N: samples retained and compared across.
    pub max_entries: usize,
    /// Interval between stats polls.
    pub polling_interval: Duration,
    /// Depth for the EMA smoothing factor; equal to `max_entries`
    /// unless overridden.
    pub ema_depth: usize,
    /// Base gain when latency is rising.
    pub base_sensitivity_up: f64,
    /// Base gain when latency is falling.
    pub base_sensitivity_down: f64,
}

impl Config {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_entries = parse_usize(&lookup, "MAX_ENTRIES", 10)?;
        let polling_secs = parse_u64(&lookup, "POLLING_INTERVAL_SECONDS", 1)?;
        let ema_depth = parse_usize(&lookup, "EMA_DEPTH", 10)?;
        let base_sensitivity_up = parse_f64(&lookup, "BASE_SENSITIVITY_UP", 1.0)?;
        let base_sensitivity_down = parse_f64(&lookup, "BASE_SENSITIVITY_DOWN", 5.0)?;

        Ok(Self {
            max_entries,
            polling_interval: Duration::from_secs(polling_secs),
            ema_depth,
            base_sensitivity_up,
            base_sensitivity_down,
        })
    }

    /// The EMA smoothing factor: `2 / (depth + 1)`, the standard
    /// EMA-over-N equivalence.
    pub fn alpha(&self) -> f64 {
        2.0 / (self.ema_depth as f64 + 1.0)
    }
}

fn parse_usize<F>(lookup: &F, name: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value.parse().map_err(|source| ConfigError::InvalidInt {
            name,
            value,
            source,
        }),
        None => Ok(default),
    }
}

fn parse_u64<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value.parse().map_err(|source| ConfigError::InvalidInt {
            name,
            value,
            source,
        }),
        None => Ok(default),
    }
}

fn parse_f64<F>(lookup: &F, name: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value.parse().map_err(|source| ConfigError::InvalidFloat {
            name,
            value,
            source,
        }),
        None => Ok(default),
    }
}
