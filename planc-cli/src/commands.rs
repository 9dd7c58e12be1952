use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use planc_core::plan::{
    self, report, Amounts, Fund, Judgment, MarketInput, MonthlyPlan, NextPurchase, PurchaseLine,
    RebalanceMode, RebalanceReport, TopUp,
};
use planc_core::{Config, Launcher, MarketClient, Snapshot, SnapshotRequest};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::cli::{JudgeArgs, LaunchArgs, RebalanceArgs, RebalanceModeArg};

#[derive(Debug, Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

fn print_one<T: Serialize>(json: bool, data: T, row: impl Fn(&T) -> String) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        print!("{}", row(&data));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct LaunchSummary {
    exit_code: i32,
    interrupted: bool,
}

/// Returns the exit code the process should end with.
pub fn launch(config: Config, args: LaunchArgs, base_dir: &Path, json: bool) -> Result<i32> {
    let mut launcher_config = config.launcher;
    if let Some(venv) = args.venv {
        launcher_config.venv_dir = venv;
    }
    if let Some(script) = args.script {
        launcher_config.script = script;
    }
    if let Some(runner) = args.runner {
        launcher_config.runner = runner;
    }
    if let Some(color) = args.color {
        launcher_config.color = color;
    }

    let mut launcher = Launcher::new(launcher_config, base_dir);
    if json {
        launcher = launcher.quiet();
    }
    let outcome = launcher.launch().context("Failed to launch the app")?;
    let exit_code = outcome.exit_code();
    info!("App exited with code {}", exit_code);

    if json {
        let data = LaunchSummary {
            exit_code,
            interrupted: outcome.interrupted,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    }
    Ok(exit_code)
}

#[derive(Debug, Serialize)]
struct JudgeOutput {
    date: String,
    judgment: Judgment,
    plan: MonthlyPlan,
    top_up: TopUp,
    purchase_lines: Vec<PurchaseLine>,
    extra_total: i64,
    message: String,
}

fn market_change(
    name: &str,
    change: Option<f64>,
    closes: Option<&Path>,
) -> Result<Option<f64>> {
    let Some(path) = closes else {
        return Ok(change);
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let series = plan::parse_closes(&content)
        .with_context(|| format!("Invalid closes in {}", path.display()))?;
    let change = plan::index_change(&series);
    match change {
        Some(c) => debug!("{} 3-month change {:+.2}% from {} closes", name, c, series.len()),
        None => warn!(
            "{}: {} closes is not enough for a 3-month change",
            name,
            series.len()
        ),
    }
    Ok(change)
}

fn judgment_date(date: Option<NaiveDate>) -> String {
    date.unwrap_or_else(|| Local::now().date_naive())
        .format("%Y年%m月%d日")
        .to_string()
}

/// Fetch whatever the command line left open, unless fetching is off.
fn fetch_missing(config: &Config, request: SnapshotRequest, offline: bool) -> Result<Snapshot> {
    if request.is_empty() {
        return Ok(Snapshot::default());
    }
    if offline || !config.market.fetch {
        debug!("Fetching disabled, {:?} stays unknown", request);
        return Ok(Snapshot::default());
    }

    let client = MarketClient::new(&config.market)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build the async runtime")?;
    Ok(runtime.block_on(client.snapshot(request)))
}

pub fn judge(config: &Config, args: JudgeArgs, json: bool) -> Result<()> {
    let nikkei_change =
        market_change("Nikkei 225", args.nikkei_change, args.nikkei_closes.as_deref())?;
    let sp500_change =
        market_change("S&P 500", args.sp500_change, args.sp500_closes.as_deref())?;

    let request = SnapshotRequest {
        vix: args.vix.is_none(),
        japan: args.nikkei_change.is_none() && args.nikkei_closes.is_none(),
        united_states: args.sp500_change.is_none() && args.sp500_closes.is_none(),
    };
    let fetched = fetch_missing(config, request, args.offline)?;

    let vix = args.vix.or(fetched.vix);
    let japan = MarketInput {
        buffett: args.buffett_jp,
        index_change: nikkei_change.or(fetched.japan_change),
    };
    let united_states = MarketInput {
        buffett: args.buffett_us,
        index_change: sp500_change.or(fetched.united_states_change),
    };

    let judgment = Judgment::evaluate(&config.thresholds, vix, japan, united_states)?;
    let plan = MonthlyPlan::new(args.base.unwrap_or(config.plan.base_amount))?;
    let top_up = TopUp::for_pattern(&plan, judgment.pattern);
    info!("Judged {:?}", judgment.pattern);

    let date = judgment_date(args.date);
    let output = JudgeOutput {
        message: report::summary_message(&date, &judgment, &plan),
        purchase_lines: top_up.purchase_lines(&plan),
        extra_total: top_up.extra_total(&plan),
        date,
        judgment,
        plan,
        top_up,
    };

    print_one(json, output, |out| {
        format!(
            "{}\n{}\n{}\n",
            report::conditions_table(&out.judgment),
            report::purchase_table(&out.plan, &out.top_up),
            out.message
        )
    })
}

#[derive(Debug, Serialize)]
struct RebalanceOutput {
    report: RebalanceReport,
    next_purchase: Option<NextPurchase>,
    #[serde(skip)]
    plan: MonthlyPlan,
}

pub fn rebalance(config: &Config, args: RebalanceArgs, json: bool) -> Result<()> {
    let holdings = Amounts::from_fn(|fund| match fund {
        Fund::JpStock => args.jp_stock,
        Fund::JpReit => args.jp_reit,
        Fund::JpBond => args.jp_bond,
        Fund::GlobalStock => args.global_stock,
        Fund::UsStock => args.us_stock,
        Fund::OsReit => args.os_reit,
        Fund::OsBond => args.os_bond,
    });
    let Some(balance) = RebalanceReport::compute(holdings)? else {
        anyhow::bail!("Enter at least one holding to analyse the balance");
    };

    let plan = MonthlyPlan::new(args.base.unwrap_or(config.plan.base_amount))?;
    let mode = match args.mode {
        RebalanceModeArg::Within => RebalanceMode::WithinBudget {
            min_purchase: args.min_purchase,
        },
        RebalanceModeArg::Extra => RebalanceMode::ExtraFunds {
            additional: args.additional,
        },
    };
    let next_purchase = NextPurchase::plan(&balance, &plan, mode)?;

    let output = RebalanceOutput {
        report: balance,
        next_purchase,
        plan,
    };
    print_one(json, output, |out| {
        report::rebalance_text(&out.report, &out.plan, out.next_purchase.as_ref())
    })
}
