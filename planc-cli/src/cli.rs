use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use planc_core::ColorChoice;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "planc",
    version,
    about = "Plan C launcher and crash-judgment toolkit",
    long_about = "Without a subcommand, activates the virtual environment \
                  and starts the Plan C web app."
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "PLANC_CONFIG",
        help = "Config file (default: ./planc.toml if present)"
    )]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(short, long, global = true, help = "Debug logging")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Activate the virtual environment and run the web app
    Launch(LaunchArgs),
    /// Judge both markets and print this month's purchases
    Judge(JudgeArgs),
    /// Compare holdings with the 30:70 target and plan the next purchase
    Rebalance(RebalanceArgs),
}

#[derive(Args, Debug, Default)]
pub struct LaunchArgs {
    #[arg(long, help = "Virtual environment directory")]
    pub venv: Option<PathBuf>,
    #[arg(long, help = "App script handed to the runner")]
    pub script: Option<PathBuf>,
    #[arg(long, help = "Runner program")]
    pub runner: Option<String>,
    #[arg(long, help = "auto, always or never")]
    pub color: Option<ColorChoice>,
}

#[derive(Args, Debug)]
pub struct JudgeArgs {
    #[arg(long, allow_negative_numbers = true, help = "VIX index (fetched when omitted)")]
    pub vix: Option<f64>,
    #[arg(long, help = "Japanese Buffett indicator in percent")]
    pub buffett_jp: f64,
    #[arg(long, help = "US Buffett indicator in percent")]
    pub buffett_us: f64,
    #[arg(
        long,
        allow_negative_numbers = true,
        conflicts_with = "nikkei_closes",
        help = "Nikkei 225 3-month change in percent"
    )]
    pub nikkei_change: Option<f64>,
    #[arg(long, help = "File of Nikkei 225 daily closes, oldest first")]
    pub nikkei_closes: Option<PathBuf>,
    #[arg(
        long,
        allow_negative_numbers = true,
        conflicts_with = "sp500_closes",
        help = "S&P 500 3-month change in percent"
    )]
    pub sp500_change: Option<f64>,
    #[arg(long, help = "File of S&P 500 daily closes, oldest first")]
    pub sp500_closes: Option<PathBuf>,
    #[arg(long, help = "Regular monthly purchase in yen")]
    pub base: Option<i64>,
    #[arg(long, help = "Judgment date, YYYY-MM-DD (default: today)")]
    pub date: Option<NaiveDate>,
    #[arg(long, help = "Do not fetch VIX or index closes; missing values count as unknown")]
    pub offline: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RebalanceModeArg {
    /// Redistribute the regular monthly amount
    Within,
    /// Add extra funds on top of the regular amount
    Extra,
}

#[derive(Args, Debug)]
pub struct RebalanceArgs {
    #[arg(long, default_value_t = 0)]
    pub jp_stock: i64,
    #[arg(long, default_value_t = 0)]
    pub jp_reit: i64,
    #[arg(long, default_value_t = 0)]
    pub jp_bond: i64,
    #[arg(long, default_value_t = 0)]
    pub global_stock: i64,
    #[arg(long, default_value_t = 0)]
    pub us_stock: i64,
    #[arg(long, default_value_t = 0)]
    pub os_reit: i64,
    #[arg(long, default_value_t = 0)]
    pub os_bond: i64,
    #[arg(long, value_enum, default_value_t = RebalanceModeArg::Within)]
    pub mode: RebalanceModeArg,
    #[arg(long, default_value_t = 100_000, help = "Extra funds for --mode extra")]
    pub additional: i64,
    #[arg(long, default_value_t = 3_000, help = "Minimum per fund for --mode within")]
    pub min_purchase: i64,
    #[arg(long, help = "Regular monthly purchase in yen")]
    pub base: Option<i64>,
}
