//! Plan C
//!
//! `planc` with no arguments activates the virtual environment, runs the
//! Streamlit app and deactivates the environment when the app exits. The
//! `judge` and `rebalance` subcommands run the same rules in the terminal.

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use planc_core::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries the banner and results
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("planc_core={default_level},planc={default_level}"))
    });
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let config = Config::load(cli.config.as_deref(), &cwd)?;
    debug!("Config: {:?}", config);

    match cli.command {
        None => exit_with(commands::launch(config, Default::default(), &cwd, cli.json)?),
        Some(Commands::Launch(args)) => exit_with(commands::launch(config, args, &cwd, cli.json)?),
        Some(Commands::Judge(args)) => commands::judge(&config, args, cli.json),
        Some(Commands::Rebalance(args)) => commands::rebalance(&config, args, cli.json),
    }
}

fn exit_with(code: i32) -> Result<()> {
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
