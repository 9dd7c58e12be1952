//! Crash judgment
//!
//! A market is judged to be in a crash only when all three conditions hold:
//! VIX above its threshold (shared by both markets), the market's Buffett
//! indicator below its threshold, and the market index down by at least the
//! drawdown threshold over roughly three months.

use serde::Serialize;

use super::{Region, Thresholds};
use crate::error::PlanError;

/// Trading days back used for the 3-month change
pub const LOOKBACK_DAYS: usize = 60;

/// Percent change between the last close and the close `LOOKBACK_DAYS`
/// entries from the end. `None` when the series is too short.
pub fn index_change(closes: &[f64]) -> Option<f64> {
    if closes.len() < LOOKBACK_DAYS {
        return None;
    }
    let current = *closes.last()?;
    let past = closes[closes.len() - LOOKBACK_DAYS];
    if past == 0.0 {
        return None;
    }
    Some((current - past) / past * 100.0)
}

/// Parse closing prices, one per line, oldest first. For CSV lines the last
/// field is taken, so `date,close` exports work; a non-numeric first line is
/// treated as a header. Blank lines are skipped.
pub fn parse_closes(text: &str) -> Result<Vec<f64>, PlanError> {
    let mut closes = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let field = line.rsplit(',').next().unwrap_or(line).trim();
        match field.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => closes.push(v),
            Ok(_) => {
                return Err(PlanError::InvalidSeries(format!(
                    "line {}: close must be a positive number, got '{}'",
                    i + 1,
                    field
                )))
            }
            Err(_) if closes.is_empty() && i == 0 => continue,
            Err(_) => {
                return Err(PlanError::InvalidSeries(format!(
                    "line {}: '{}' is not a number",
                    i + 1,
                    field
                )))
            }
        }
    }
    Ok(closes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Japan,
    UnitedStates,
}

impl Market {
    pub fn label(self) -> &'static str {
        match self {
            Market::Japan => "日本市場",
            Market::UnitedStates => "米国市場",
        }
    }

    pub fn index_name(self) -> &'static str {
        match self {
            Market::Japan => "日経平均",
            Market::UnitedStates => "S&P500",
        }
    }

    /// Yahoo Finance symbol of the market index
    pub fn index_symbol(self) -> &'static str {
        match self {
            Market::Japan => "^N225",
            Market::UnitedStates => "^GSPC",
        }
    }

    fn buffett_label(self) -> &'static str {
        match self {
            Market::Japan => "日本バフェット",
            Market::UnitedStates => "米国バフェット",
        }
    }

    /// Asset region that receives the crash fund
    pub fn region(self) -> Region {
        match self {
            Market::Japan => Region::Japan,
            Market::UnitedStates => Region::Overseas,
        }
    }
}

/// Values entered for one market
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketInput {
    /// Buffett indicator in percent
    pub buffett: f64,
    /// 3-month index change in percent, if known
    pub index_change: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Vix,
    Buffett,
    IndexDrop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub label: String,
    pub met: bool,
    pub value: Option<f64>,
}

impl Condition {
    /// Value as displayed next to the condition
    pub fn display_value(&self) -> String {
        match (self.kind, self.value) {
            (_, None) => "N/A".to_string(),
            (ConditionKind::Vix, Some(v)) => format!("{v:.2}"),
            (ConditionKind::Buffett, Some(v)) => format!("{v:.1}%"),
            (ConditionKind::IndexDrop, Some(v)) => format!("{v:+.2}%"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketVerdict {
    pub market: Market,
    pub conditions: Vec<Condition>,
    pub crash: bool,
}

impl MarketVerdict {
    fn evaluate(
        market: Market,
        thresholds: &Thresholds,
        vix: Option<f64>,
        input: MarketInput,
    ) -> Self {
        let conditions = vec![
            Condition {
                kind: ConditionKind::Vix,
                label: format!("VIX > {}", thresholds.vix_above),
                met: vix.is_some_and(|v| v > thresholds.vix_above),
                value: vix,
            },
            Condition {
                kind: ConditionKind::Buffett,
                label: format!("{} < {}%", market.buffett_label(), thresholds.buffett_below),
                met: input.buffett < thresholds.buffett_below,
                value: Some(input.buffett),
            },
            Condition {
                kind: ConditionKind::IndexDrop,
                label: format!("{} ≤ {}%", market.index_name(), thresholds.drawdown_at_most),
                met: input
                    .index_change
                    .is_some_and(|c| c <= thresholds.drawdown_at_most),
                value: input.index_change,
            },
        ];
        let crash = conditions.iter().all(|c| c.met);
        Self {
            market,
            conditions,
            crash,
        }
    }
}

/// One of the four outcomes of judging both markets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    BothNormal,
    JapanOnly,
    UnitedStatesOnly,
    BothCrash,
}

impl Pattern {
    pub fn from_crashes(japan: bool, united_states: bool) -> Self {
        match (japan, united_states) {
            (false, false) => Pattern::BothNormal,
            (true, false) => Pattern::JapanOnly,
            (false, true) => Pattern::UnitedStatesOnly,
            (true, true) => Pattern::BothCrash,
        }
    }

    /// Whether the crash fund of `region` is spent under this pattern
    pub fn tops_up(self, region: Region) -> bool {
        matches!(
            (self, region),
            (Pattern::JapanOnly, Region::Japan)
                | (Pattern::UnitedStatesOnly, Region::Overseas)
                | (Pattern::BothCrash, _)
        )
    }

    pub fn headline(self) -> &'static str {
        match self {
            Pattern::BothNormal => "両市場とも通常（作業なし）",
            Pattern::JapanOnly => "日本市場のみ暴落！日本資産に追加投資",
            Pattern::UnitedStatesOnly => "米国（世界）市場のみ暴落！海外資産に追加投資",
            Pattern::BothCrash => "日米両市場とも暴落！全資産に追加投資",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Judgment {
    pub vix: Option<f64>,
    pub japan: MarketVerdict,
    pub united_states: MarketVerdict,
    pub pattern: Pattern,
}

impl Judgment {
    pub fn evaluate(
        thresholds: &Thresholds,
        vix: Option<f64>,
        japan: MarketInput,
        united_states: MarketInput,
    ) -> Result<Self, PlanError> {
        if let Some(v) = vix {
            PlanError::check_range("vix", v, 0.0, f64::MAX)?;
        }
        PlanError::check_range("buffett_jp", japan.buffett, 0.0, 300.0)?;
        PlanError::check_range("buffett_us", united_states.buffett, 0.0, 300.0)?;
        for (field, change) in [
            ("nikkei_change", japan.index_change),
            ("sp500_change", united_states.index_change),
        ] {
            if let Some(c) = change {
                PlanError::check_range(field, c, -100.0, f64::MAX)?;
            }
        }

        let japan = MarketVerdict::evaluate(Market::Japan, thresholds, vix, japan);
        let united_states =
            MarketVerdict::evaluate(Market::UnitedStates, thresholds, vix, united_states);
        let pattern = Pattern::from_crashes(japan.crash, united_states.crash);

        Ok(Self {
            vix,
            japan,
            united_states,
            pattern,
        })
    }

    pub fn verdict(&self, market: Market) -> &MarketVerdict {
        match market {
            Market::Japan => &self.japan,
            Market::UnitedStates => &self.united_states,
        }
    }
}
