//! Configuration
//!
//! Optional `planc.toml`. Every field has a default, so a missing file or a
//! partial file both yield a usable configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::plan::Thresholds;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "planc.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub launcher: LauncherConfig,
    pub plan: PlanConfig,
    pub thresholds: Thresholds,
    pub market: MarketConfig,
}

/// How the launcher finds and starts the web app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Virtual environment directory
    #[serde(rename = "venv")]
    pub venv_dir: PathBuf,
    /// Entry script handed to the runner
    pub script: PathBuf,
    /// Runner program, resolved on the activated PATH
    pub runner: String,
    /// Arguments placed before the script path
    pub runner_args: Vec<String>,
    /// Prompt name exported as VIRTUAL_ENV_PROMPT (defaults to the directory name)
    pub prompt: Option<String>,
    pub color: ColorChoice,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            venv_dir: PathBuf::from("venv"),
            script: PathBuf::from("app/plan_c_app.py"),
            runner: "streamlit".to_string(),
            runner_args: vec!["run".to_string()],
            prompt: None,
            color: ColorChoice::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Regular monthly purchase in yen
    pub base_amount: i64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            base_amount: crate::plan::DEFAULT_BASE_AMOUNT,
        }
    }
}

/// Where daily closes are fetched from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Fetch values not given on the command line
    pub fetch: bool,
    /// Chart endpoint; the symbol is appended as a path segment
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            fetch: true,
            base_url: crate::market::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

/// When to emit ANSI colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Decide for a stream given whether it is a terminal and whether NO_COLOR is set.
    pub fn enabled(self, is_terminal: bool, no_color: bool) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => is_terminal && !no_color,
        }
    }
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            other => Err(format!(
                "unknown color choice '{other}' (expected auto, always or never)"
            )),
        }
    }
}

impl Config {
    /// Parse a config document.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Load the explicit file if given, else `planc.toml` in `dir` if present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            debug!("Loading config from {}", path.display());
            return Self::from_file(path);
        }

        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            debug!("Loading config from {}", candidate.display());
            Self::from_file(&candidate)
        } else {
            debug!("No config file, using defaults");
            Ok(Self::default())
        }
    }
}
