//! Monthly allocation and crash-fund top-ups

use serde::Serialize;

use super::{round_to_1000, Amounts, Fund, Pattern, Region};
use crate::error::PlanError;

/// Monthly cap of the NISA accumulation ("tsumitate") slot
pub const TSUMITATE_LIMIT: i64 = 100_000;
pub const MIN_BASE_AMOUNT: i64 = 10_000;
pub const MAX_BASE_AMOUNT: i64 = 10_000_000;

const TSUMITATE_NAME: &str = "eMAXIS Slim 全世界株式【つみたて投資枠】";
const GROWTH_NAME: &str = "eMAXIS Slim 全世界株式【成長投資枠】";

/// Global stock amount split over the two NISA slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GlobalSplit {
    pub tsumitate: i64,
    pub growth: i64,
}

impl GlobalSplit {
    fn capped(total: i64) -> Self {
        if total <= TSUMITATE_LIMIT {
            Self {
                tsumitate: total,
                growth: 0,
            }
        } else {
            Self {
                tsumitate: TSUMITATE_LIMIT,
                growth: total - TSUMITATE_LIMIT,
            }
        }
    }
}

/// The regular purchase made automatically every month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPlan {
    pub base: i64,
    pub regular: Amounts,
    pub global: GlobalSplit,
    /// Reserve spent on Japanese funds when Japan crashes
    pub crash_fund_japan: i64,
    /// Reserve spent on overseas funds when the US crashes
    pub crash_fund_overseas: i64,
}

impl MonthlyPlan {
    pub fn new(base: i64) -> Result<Self, PlanError> {
        PlanError::check_range(
            "base_amount",
            base as f64,
            MIN_BASE_AMOUNT as f64,
            MAX_BASE_AMOUNT as f64,
        )?;

        let base_f = base as f64;
        let regular = Amounts::from_fn(|fund| round_to_1000(base_f * fund.ratio()));
        let global = GlobalSplit::capped(regular[Fund::GlobalStock]);

        Ok(Self {
            base,
            regular,
            global,
            crash_fund_japan: round_to_1000(base_f * Region::Japan.ratio()),
            crash_fund_overseas: round_to_1000(base_f * Region::Overseas.ratio()),
        })
    }

    pub fn region_total(&self, region: Region) -> i64 {
        self.regular.region_total(region)
    }

    pub fn crash_fund(&self, region: Region) -> i64 {
        match region {
            Region::Japan => self.crash_fund_japan,
            Region::Overseas => self.crash_fund_overseas,
        }
    }
}

/// Extra purchases for a judgment pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopUp {
    pub pattern: Pattern,
    pub additional: Amounts,
    /// How the global stock addition is split over the NISA slots
    pub global: GlobalSplit,
}

impl TopUp {
    pub fn for_pattern(plan: &MonthlyPlan, pattern: Pattern) -> Self {
        let additional = Amounts::from_fn(|fund| {
            let region = fund.region();
            if pattern.tops_up(region) {
                round_to_1000(plan.crash_fund(region) as f64 * fund.ratio() / region.ratio())
            } else {
                0
            }
        });
        let global = split_global_addition(plan, additional[Fund::GlobalStock]);

        Self {
            pattern,
            additional,
            global,
        }
    }

    /// Crash fund spent in `region` (0 when the region is not topped up)
    pub fn region_extra(&self, plan: &MonthlyPlan, region: Region) -> i64 {
        if self.pattern.tops_up(region) {
            plan.crash_fund(region)
        } else {
            0
        }
    }

    /// Total extra purchase for the month
    pub fn extra_total(&self, plan: &MonthlyPlan) -> i64 {
        match self.pattern {
            Pattern::BothNormal => 0,
            Pattern::JapanOnly => plan.crash_fund_japan,
            Pattern::UnitedStatesOnly => plan.crash_fund_overseas,
            Pattern::BothCrash => plan.base,
        }
    }

    /// Purchase table: one line per fund, with the global stock split into
    /// two lines when either the regular amount or the addition needs the
    /// growth slot.
    pub fn purchase_lines(&self, plan: &MonthlyPlan) -> Vec<PurchaseLine> {
        let mut lines = Vec::with_capacity(8);
        for fund in Fund::ALL {
            let tops_up = self.pattern.tops_up(fund.region());
            if fund != Fund::GlobalStock {
                lines.push(PurchaseLine::new(
                    fund.product_name(),
                    plan.regular[fund],
                    tops_up.then_some(self.additional[fund]),
                ));
                continue;
            }

            if plan.global.growth > 0 || self.global.growth > 0 {
                let extra = |amount: i64| (tops_up && amount > 0).then_some(amount);
                lines.push(PurchaseLine::new(
                    TSUMITATE_NAME,
                    plan.global.tsumitate,
                    extra(self.global.tsumitate),
                ));
                lines.push(PurchaseLine::new(
                    GROWTH_NAME,
                    plan.global.growth,
                    extra(self.global.growth),
                ));
            } else {
                lines.push(PurchaseLine::new(
                    fund.product_name(),
                    plan.regular[fund],
                    tops_up.then_some(self.additional[fund]),
                ));
            }
        }
        lines
    }
}

fn split_global_addition(plan: &MonthlyPlan, addition: i64) -> GlobalSplit {
    let total = plan.regular[Fund::GlobalStock];
    if plan.global.growth > 0 {
        // Keep the regular tsumitate share
        let share = plan.global.tsumitate as f64 / total as f64;
        let tsumitate = round_to_1000(addition as f64 * share);
        GlobalSplit {
            tsumitate,
            growth: addition - tsumitate,
        }
    } else if total + addition <= TSUMITATE_LIMIT {
        GlobalSplit {
            tsumitate: addition,
            growth: 0,
        }
    } else {
        let tsumitate = addition.min(TSUMITATE_LIMIT - plan.global.tsumitate);
        GlobalSplit {
            tsumitate,
            growth: addition - tsumitate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseLine {
    pub name: String,
    /// Automatic purchase on the 15th
    pub regular: i64,
    /// Manual purchase on the 14th, if any
    pub additional: Option<i64>,
    pub total: i64,
}

impl PurchaseLine {
    fn new(name: &str, regular: i64, additional: Option<i64>) -> Self {
        Self {
            name: name.to_string(),
            regular,
            additional,
            total: regular + additional.unwrap_or(0),
        }
    }
}
