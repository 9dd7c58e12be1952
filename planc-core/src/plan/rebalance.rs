//! Portfolio rebalancing
//!
//! Compares current holdings with the target ratios and proposes the next
//! purchase so that underweight funds catch up.

use serde::Serialize;

use super::{round_to_1000, Amounts, Fund, MonthlyPlan, Region};
use crate::error::PlanError;

/// Region imbalance below this is considered balanced
pub const BALANCE_TOLERANCE: i64 = 10_000;
/// Fund adjustments below this are shown as zero and not bought
pub const MIN_ADJUSTMENT: i64 = 1_000;
pub const MAX_HOLDING: i64 = 100_000_000;
pub const MIN_PURCHASE_RANGE: (i64, i64) = (1_000, 50_000);
pub const MAX_ADDITIONAL: i64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebalanceReport {
    pub holdings: Amounts,
    pub total: i64,
    /// Current region shares in percent
    pub japan_ratio: f64,
    pub overseas_ratio: f64,
    pub target_japan: i64,
    pub target_overseas: i64,
    pub adjust_japan: i64,
    pub adjust_overseas: i64,
    pub targets: Amounts,
    pub adjustments: Amounts,
}

impl RebalanceReport {
    /// Analyse `holdings`. `None` when nothing is held yet.
    pub fn compute(holdings: Amounts) -> Result<Option<Self>, PlanError> {
        for (fund, amount) in holdings.iter() {
            PlanError::check_range(fund.key(), amount as f64, 0.0, MAX_HOLDING as f64)?;
        }

        let total = holdings.total();
        if total == 0 {
            return Ok(None);
        }

        let current_japan = holdings.region_total(Region::Japan);
        let current_overseas = holdings.region_total(Region::Overseas);
        let total_f = total as f64;
        let target_japan = round_to_1000(total_f * Region::Japan.ratio());
        let target_overseas = round_to_1000(total_f * Region::Overseas.ratio());

        let targets = Amounts::from_fn(|fund| round_to_1000(total_f * fund.ratio()));
        let adjustments = Amounts::from_fn(|fund| targets[fund] - holdings[fund]);

        Ok(Some(Self {
            holdings,
            total,
            japan_ratio: current_japan as f64 / total_f * 100.0,
            overseas_ratio: current_overseas as f64 / total_f * 100.0,
            target_japan,
            target_overseas,
            adjust_japan: target_japan - current_japan,
            adjust_overseas: target_overseas - current_overseas,
            targets,
            adjustments,
        }))
    }

    pub fn is_balanced(&self) -> bool {
        self.adjust_japan.abs() < BALANCE_TOLERANCE
            && self.adjust_overseas.abs() < BALANCE_TOLERANCE
    }

    /// Adjustment as displayed: small differences are shown as zero
    pub fn displayed_adjustment(&self, fund: Fund) -> i64 {
        let adjust = self.adjustments[fund];
        if adjust.abs() >= MIN_ADJUSTMENT {
            adjust
        } else {
            0
        }
    }

    /// Funds worth buying now to reach their target
    pub fn buy_list(&self) -> Vec<(Fund, i64)> {
        self.adjustments
            .iter()
            .filter(|&(_, adjust)| adjust >= MIN_ADJUSTMENT)
            .collect()
    }

    /// Every fund below its target, in fund order
    pub fn shortages(&self) -> Vec<(Fund, i64)> {
        self.adjustments.iter().filter(|&(_, adjust)| adjust > 0).collect()
    }
}

/// How the next purchase is funded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RebalanceMode {
    /// Redistribute the regular monthly amount, keeping `min_purchase` in every fund
    WithinBudget { min_purchase: i64 },
    /// Add `additional` yen on top of the regular monthly amount
    ExtraFunds { additional: i64 },
}

impl RebalanceMode {
    fn validate(self) -> Result<(), PlanError> {
        match self {
            RebalanceMode::WithinBudget { min_purchase } => PlanError::check_range(
                "min_purchase",
                min_purchase as f64,
                MIN_PURCHASE_RANGE.0 as f64,
                MIN_PURCHASE_RANGE.1 as f64,
            ),
            RebalanceMode::ExtraFunds { additional } => {
                PlanError::check_range("additional", additional as f64, 0.0, MAX_ADDITIONAL as f64)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextPurchase {
    pub mode: RebalanceMode,
    pub amounts: Amounts,
    pub total: i64,
    /// Months of this purchase needed per underweight fund
    pub months: Vec<(Fund, i64)>,
    pub max_months: i64,
    /// Sum of all shortages
    pub total_shortage: i64,
}

impl NextPurchase {
    /// Plan the next purchase. `None` when no fund is underweight.
    pub fn plan(
        report: &RebalanceReport,
        plan: &MonthlyPlan,
        mode: RebalanceMode,
    ) -> Result<Option<Self>, PlanError> {
        mode.validate()?;

        let shortages = report.shortages();
        if shortages.is_empty() {
            return Ok(None);
        }
        let total_shortage: i64 = shortages.iter().map(|(_, s)| s).sum();

        let (mut amounts, pool, total) = match mode {
            RebalanceMode::WithinBudget { min_purchase } => {
                let minimum = min_purchase * Fund::ALL.len() as i64;
                if plan.base <= minimum {
                    return Err(PlanError::BudgetBelowMinimum {
                        base: plan.base,
                        minimum,
                    });
                }
                (Amounts::from_fn(|_| min_purchase), plan.base - minimum, plan.base)
            }
            RebalanceMode::ExtraFunds { additional } => {
                (plan.regular, additional, plan.base + additional)
            }
        };

        for &(fund, shortage) in &shortages {
            let share = shortage as f64 / total_shortage as f64;
            amounts[fund] += round_to_1000(pool as f64 * share);
        }

        // Rounding residue goes to the most underweight fund (first on ties)
        let residue = total - amounts.total();
        if residue != 0 {
            let mut largest = shortages[0];
            for &entry in &shortages[1..] {
                if entry.1 > largest.1 {
                    largest = entry;
                }
            }
            amounts[largest.0] += residue;
        }

        let months: Vec<(Fund, i64)> = shortages
            .iter()
            .filter_map(|&(fund, shortage)| {
                let extra = amounts[fund] - plan.regular[fund];
                (extra > 0).then(|| (fund, (shortage + extra - 1) / extra))
            })
            .collect();
        let max_months = months.iter().map(|&(_, m)| m).max().unwrap_or(0);

        Ok(Some(Self {
            mode,
            amounts,
            total,
            months,
            max_months,
            total_shortage,
        }))
    }
}
