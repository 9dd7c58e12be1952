//! Error types for launching and planning

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Virtual environment not found at {path} (expected a '{bin}' directory inside it)")]
    VenvNotFound { path: PathBuf, bin: &'static str },

    #[error("Entry script not found: {path}")]
    ScriptNotFound { path: PathBuf },

    #[error("Runner '{program}' not found on the activated PATH")]
    RunnerNotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("Failed to start '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed while waiting for the runner to exit")]
    Wait(#[source] std::io::Error),

    #[error("Failed to build the async runtime")]
    Runtime(#[source] std::io::Error),

    #[error("Could not build PATH for the virtual environment: {0}")]
    Path(#[from] std::env::JoinPathsError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Request for {symbol} failed")]
    Http {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Quote service returned HTTP {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("Unreadable chart data for {symbol}")]
    Decode {
        symbol: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Quote service error for {symbol}: {code}: {description}")]
    Api {
        symbol: String,
        code: String,
        description: String,
    },

    #[error("No closes returned for {symbol}")]
    NoData { symbol: String },

    #[error("Failed to build the HTTP client")]
    Client(#[source] reqwest::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("Base amount {base} is below the minimum purchases total {minimum}")]
    BudgetBelowMinimum { base: i64, minimum: i64 },

    #[error("Invalid price series: {0}")]
    InvalidSeries(String),
}

impl PlanError {
    /// Reject `value` unless it lies in `min..=max`.
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), Self> {
        if value.is_finite() && (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(PlanError::OutOfRange {
                field,
                min,
                max,
                value,
            })
        }
    }
}
