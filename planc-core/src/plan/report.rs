//! Text rendering of judgments and plans

use std::fmt::Write;

use super::{
    Fund, Judgment, Market, MonthlyPlan, NextPurchase, Pattern, RebalanceReport, Region, TopUp,
};

/// `1234567` -> `1,234,567円`
pub fn yen(amount: i64) -> String {
    format!("{}円", group_thousands(amount))
}

/// `1234` -> `+1,234円`, `0` -> `±0円`
pub fn signed_yen(amount: i64) -> String {
    match amount {
        0 => "±0円".to_string(),
        a if a > 0 => format!("+{}", yen(a)),
        a => yen(a),
    }
}

fn group_thousands(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn market_state(crash: bool) -> &'static str {
    if crash {
        "🚨 暴落"
    } else {
        "✅ 通常"
    }
}

/// Notification message summarising a judgment
pub fn summary_message(date: &str, judgment: &Judgment, plan: &MonthlyPlan) -> String {
    let vix = judgment
        .vix
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "N/A".to_string());

    let mut msg = String::new();
    let _ = writeln!(msg, "📊 Plan C 暴落判定結果");
    let _ = writeln!(msg, "判定日: {date}");
    let _ = writeln!(msg);
    let _ = writeln!(msg, "【市場状況】");
    let _ = writeln!(msg, "VIX指数: {vix}");
    let _ = writeln!(msg, "日本市場: {}", market_state(judgment.japan.crash));
    let _ = writeln!(msg, "米国市場: {}", market_state(judgment.united_states.crash));
    let _ = writeln!(msg);
    let _ = writeln!(msg, "【最終判定】");

    let base = plan.base;
    match judgment.pattern {
        Pattern::BothNormal => {
            let _ = write!(
                msg,
                "✅ 両市場とも通常\n追加投資: なし\n15日の自動買付: {}",
                yen(base)
            );
        }
        Pattern::JapanOnly => {
            let _ = write!(
                msg,
                "🚨 日本市場のみ暴落\n追加投資: 日本資産に+{}\n合計: {}",
                yen(plan.crash_fund_japan),
                yen(base + plan.crash_fund_japan)
            );
        }
        Pattern::UnitedStatesOnly => {
            let _ = write!(
                msg,
                "🚨 米国市場のみ暴落\n追加投資: 海外資産に+{}\n合計: {}",
                yen(plan.crash_fund_overseas),
                yen(base + plan.crash_fund_overseas)
            );
        }
        Pattern::BothCrash => {
            let _ = write!(
                msg,
                "🚨 両市場とも暴落\n追加投資: 全資産に+{}\n合計: {}",
                yen(base),
                yen(base * 2)
            );
        }
    }
    msg
}

/// Per-market condition tables
pub fn conditions_table(judgment: &Judgment) -> String {
    let mut out = String::new();
    for market in [Market::Japan, Market::UnitedStates] {
        let verdict = judgment.verdict(market);
        let _ = writeln!(out, "[{}] {}", market.label(), market_state(verdict.crash));
        for c in &verdict.conditions {
            let result = if c.met { "✅ 該当" } else { "❌ 非該当" };
            let _ = writeln!(out, "  {:<20} {:<10} {}", c.label, result, c.display_value());
        }
    }
    out
}

/// Purchase table for the 14th (manual) and the 15th (automatic)
pub fn purchase_table(plan: &MonthlyPlan, top_up: &TopUp) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", top_up.pattern.headline());
    for line in top_up.purchase_lines(plan) {
        let additional = line
            .additional
            .map(|a| format!("+{}", yen(a)))
            .unwrap_or_else(|| "－".to_string());
        let _ = writeln!(
            out,
            "  {}\n      通常 {:>12}  追加 {:>12}  合計 {:>12}",
            line.name,
            yen(line.regular),
            additional,
            yen(line.total)
        );
    }
    for region in [Region::Japan, Region::Overseas] {
        let regular = plan.region_total(region);
        let extra = top_up.region_extra(plan, region);
        let _ = writeln!(
            out,
            "  {}: {} + {} = {}",
            region.label(),
            yen(regular),
            yen(extra),
            yen(regular + extra)
        );
    }
    let extra = top_up.extra_total(plan);
    let _ = writeln!(
        out,
        "  合計: {} + {} = {}",
        yen(plan.base),
        yen(extra),
        yen(plan.base + extra)
    );
    out
}

/// Rebalance analysis and, if any, the next purchase proposal
pub fn rebalance_text(
    report: &RebalanceReport,
    plan: &MonthlyPlan,
    next: Option<&NextPurchase>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "現在の総資産: {}", yen(report.total));
    let _ = writeln!(
        out,
        "日本資産比率: {:.1}% ({:+.1}%)  海外資産比率: {:.1}% ({:+.1}%)",
        report.japan_ratio,
        report.japan_ratio - Region::Japan.ratio() * 100.0,
        report.overseas_ratio,
        report.overseas_ratio - Region::Overseas.ratio() * 100.0
    );

    if report.is_balanced() {
        let _ = writeln!(out, "✅ バランス良好！全体の調整は不要です（誤差1万円未満）");
    } else {
        for (region, adjust) in [
            (Region::Japan, report.adjust_japan),
            (Region::Overseas, report.adjust_overseas),
        ] {
            if adjust > 0 {
                let _ = writeln!(out, "⚠️ {}が不足 - {}の追加購入を推奨", region.label(), yen(adjust));
            } else if adjust < 0 {
                let _ = writeln!(out, "ℹ️ {}が{}過剰", region.label(), yen(-adjust));
            }
        }
    }

    let _ = writeln!(out);
    for fund in Fund::ALL {
        let _ = writeln!(
            out,
            "  {:<8} 現在 {:>14}  目標 {:>14}  調整 {:>14}",
            fund.short_name(),
            yen(report.holdings[fund]),
            yen(report.targets[fund]),
            signed_yen(report.displayed_adjustment(fund))
        );
    }

    let buy = report.buy_list();
    if buy.is_empty() {
        let _ = writeln!(out, "✅ 追加購入が必要なファンドはありません");
    } else {
        let _ = writeln!(out, "追加購入が必要なファンド:");
        for (fund, amount) in &buy {
            let _ = writeln!(out, "  {} {}", fund.product_name(), yen(*amount));
        }
        let total: i64 = buy.iter().map(|(_, a)| a).sum();
        let _ = writeln!(out, "  合計追加購入額: {}", yen(total));
    }

    let Some(next) = next else {
        let _ = writeln!(out, "✅ バランスが良好なため、通常の配分で投資してください。");
        return out;
    };

    let _ = writeln!(out);
    let _ = writeln!(out, "次回投資プラン:");
    for fund in Fund::ALL {
        let _ = writeln!(
            out,
            "  {:<8} 通常 {:>12}  調整後 {:>12}  差分 {:>12}",
            fund.short_name(),
            yen(plan.regular[fund]),
            yen(next.amounts[fund]),
            signed_yen(next.amounts[fund] - plan.regular[fund])
        );
    }
    let _ = writeln!(
        out,
        "  日本資産: {}  海外資産: {}  合計: {}",
        yen(next.amounts.region_total(Region::Japan)),
        yen(next.amounts.region_total(Region::Overseas)),
        yen(next.total)
    );
    if next.max_months > 0 {
        let _ = writeln!(out, "推奨継続期間: {}ヶ月", next.max_months);
        for (fund, months) in &next.months {
            let _ = writeln!(out, "  - {}: {}ヶ月", fund.short_name(), months);
        }
    }
    out
}
