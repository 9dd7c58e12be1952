//! Plan C investment rules
//!
//! Crash judgment for the Japanese and US markets, the 30:70 monthly
//! allocation over seven index funds, crash-fund top-ups and rebalancing.

pub mod allocation;
pub mod judgment;
pub mod rebalance;
pub mod report;

pub use allocation::{GlobalSplit, MonthlyPlan, PurchaseLine, TopUp};
pub use judgment::{
    index_change, parse_closes, Condition, ConditionKind, Judgment, Market, MarketInput,
    MarketVerdict, Pattern,
};
pub use rebalance::{NextPurchase, RebalanceMode, RebalanceReport};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::ops::{Index, IndexMut};

/// Regular monthly purchase when nothing else is configured
pub const DEFAULT_BASE_AMOUNT: i64 = 300_000;

/// Round to the nearest 1,000 yen, ties to even.
pub fn round_to_1000(value: f64) -> i64 {
    ((value / 1000.0).round_ties_even() * 1000.0) as i64
}

/// Judgment thresholds
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// VIX must be strictly above this
    pub vix_above: f64,
    /// Buffett indicator (%) must be strictly below this
    pub buffett_below: f64,
    /// 3-month index change (%) must be at or below this
    pub drawdown_at_most: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            vix_above: 30.0,
            buffett_below: 80.0,
            drawdown_at_most: -20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Japan,
    Overseas,
}

impl Region {
    pub fn ratio(self) -> f64 {
        match self {
            Region::Japan => 0.30,
            Region::Overseas => 0.70,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Region::Japan => "日本資産",
            Region::Overseas => "海外資産",
        }
    }
}

/// The seven funds bought every month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fund {
    JpStock,
    JpReit,
    JpBond,
    GlobalStock,
    UsStock,
    OsReit,
    OsBond,
}

impl Fund {
    pub const ALL: [Fund; 7] = [
        Fund::JpStock,
        Fund::JpReit,
        Fund::JpBond,
        Fund::GlobalStock,
        Fund::UsStock,
        Fund::OsReit,
        Fund::OsBond,
    ];

    /// Share of the monthly amount
    pub fn ratio(self) -> f64 {
        match self {
            Fund::JpStock => 0.15,
            Fund::JpReit => 0.10,
            Fund::JpBond => 0.05,
            Fund::GlobalStock => 0.40,
            Fund::UsStock => 0.15,
            Fund::OsReit => 0.10,
            Fund::OsBond => 0.05,
        }
    }

    pub fn region(self) -> Region {
        match self {
            Fund::JpStock | Fund::JpReit | Fund::JpBond => Region::Japan,
            _ => Region::Overseas,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Fund::JpStock => "jp_stock",
            Fund::JpReit => "jp_reit",
            Fund::JpBond => "jp_bond",
            Fund::GlobalStock => "global_stock",
            Fund::UsStock => "us_stock",
            Fund::OsReit => "os_reit",
            Fund::OsBond => "os_bond",
        }
    }

    /// Product name as shown on the brokerage
    pub fn product_name(self) -> &'static str {
        match self {
            Fund::JpStock => "eMAXIS Slim 国内株式（TOPIX）",
            Fund::JpReit => "eMAXIS Slim 国内リートインデックス",
            Fund::JpBond => "eMAXIS Slim 国内債券インデックス",
            Fund::GlobalStock => "eMAXIS Slim 全世界株式（除く日本）",
            Fund::UsStock => "eMAXIS Slim 米国株式（S&P500）",
            Fund::OsReit => "eMAXIS Slim 先進国リートインデックス",
            Fund::OsBond => "eMAXIS Slim 先進国債券インデックス",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Fund::JpStock => "国内株式",
            Fund::JpReit => "国内REIT",
            Fund::JpBond => "国内債券",
            Fund::GlobalStock => "全世界株式",
            Fund::UsStock => "米国株式",
            Fund::OsReit => "先進国REIT",
            Fund::OsBond => "先進国債券",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One yen amount per fund
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Amounts([i64; 7]);

impl Amounts {
    pub fn from_fn(f: impl Fn(Fund) -> i64) -> Self {
        Self(Fund::ALL.map(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Fund, i64)> + '_ {
        Fund::ALL.iter().map(move |&fund| (fund, self[fund]))
    }

    pub fn total(&self) -> i64 {
        self.0.iter().sum()
    }

    pub fn region_total(&self, region: Region) -> i64 {
        self.iter()
            .filter(|(fund, _)| fund.region() == region)
            .map(|(_, amount)| amount)
            .sum()
    }
}

impl Index<Fund> for Amounts {
    type Output = i64;

    fn index(&self, fund: Fund) -> &i64 {
        &self.0[fund.index()]
    }
}

impl IndexMut<Fund> for Amounts {
    fn index_mut(&mut self, fund: Fund) -> &mut i64 {
        &mut self.0[fund.index()]
    }
}

impl Serialize for Amounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Fund::ALL.len()))?;
        for (fund, amount) in self.iter() {
            map.serialize_entry(fund.key(), &amount)?;
        }
        map.end()
    }
}
