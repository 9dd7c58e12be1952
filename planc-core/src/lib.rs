//! Plan C Core Library
//!
//! Core functionality behind the `planc` launcher:
//! - Virtual environment activation with guaranteed restore
//! - Banner rendering and web-app runner supervision
//! - Daily closes and VIX from the quote service
//! - Crash-judgment rules, monthly allocation and rebalancing

pub mod banner;
pub mod config;
pub mod error;
pub mod launcher;
pub mod market;
pub mod plan;
pub mod runner;
pub mod venv;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ColorChoice, Config, LauncherConfig, MarketConfig};
pub use error::{ConfigError, LaunchError, MarketError, PlanError};
pub use launcher::Launcher;
pub use market::{MarketClient, Snapshot, SnapshotRequest};
pub use runner::{LaunchOutcome, Runner};
pub use venv::{EnvChange, EnvGuard, VirtualEnv};
