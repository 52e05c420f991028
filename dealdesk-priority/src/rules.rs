//! Priority scoring policy.
//!
//! The score is the sum of independent rules, clamped to 0..=100. Each rule
//! looks at one deal plus the shared [`ScoringContext`] and either abstains or
//! contributes points, optionally with a short reason shown next to the deal.
//! Changing any weight or label here means bumping [`POLICY_VERSION`].

use chrono::NaiveDate;
use dealdesk_model::{Deal, DealPriority, DealStage};
use rust_decimal::Decimal;

/// Version of the rule table below.
pub const POLICY_VERSION: u32 = 1;

pub const MAX_SCORE: u32 = 100;

/// Inputs shared by every rule besides the deal itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringContext {
    pub today: NaiveDate,
    /// The deal's expected value in the reference currency.
    pub normalized_value: Option<Decimal>,
    /// Outstanding unpaid debt in the reference currency.
    pub outstanding_debt: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub points: u32,
    pub reason: Option<&'static str>,
}

impl Signal {
    const fn silent(points: u32) -> Self {
        Self {
            points,
            reason: None,
        }
    }

    const fn labelled(points: u32, reason: &'static str) -> Self {
        Self {
            points,
            reason: Some(reason),
        }
    }
}

/// One entry of the policy table.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&Deal, &ScoringContext) -> Option<Signal>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "base",
        apply: base,
    },
    Rule {
        name: "schedule",
        apply: schedule,
    },
    Rule {
        name: "priority",
        apply: user_priority,
    },
    Rule {
        name: "stage",
        apply: stage,
    },
    Rule {
        name: "missing_next_action",
        apply: missing_next_action,
    },
    Rule {
        name: "value",
        apply: value,
    },
    Rule {
        name: "debt_coverage",
        apply: debt_coverage,
    },
];

const HIGH_VALUE: i64 = 500_000;
const NOTABLE_VALUE: i64 = 100_000;

fn base(_: &Deal, _: &ScoringContext) -> Option<Signal> {
    Some(Signal::silent(20))
}

fn schedule(deal: &Deal, ctx: &ScoringContext) -> Option<Signal> {
    let due = deal.next_action_date?;
    match (due - ctx.today).num_days() {
        d if d < 0 => Some(Signal::labelled(35, "متأخرة!")),
        0 => Some(Signal::labelled(30, "النهاردة")),
        1..=3 => Some(Signal::labelled(15, "قريبة")),
        _ => None,
    }
}

fn user_priority(deal: &Deal, _: &ScoringContext) -> Option<Signal> {
    match deal.priority {
        DealPriority::High => Some(Signal::labelled(20, "أولوية عالية")),
        DealPriority::Medium => Some(Signal::silent(10)),
        DealPriority::Low => None,
    }
}

fn stage(deal: &Deal, _: &ScoringContext) -> Option<Signal> {
    match deal.stage {
        DealStage::AwaitingSignature => Some(Signal::labelled(25, "قربت تتقفل")),
        DealStage::AwaitingReply => Some(Signal::silent(15)),
        DealStage::Negotiating => Some(Signal::silent(12)),
        DealStage::Talking => Some(Signal::silent(6)),
        _ => None,
    }
}

fn missing_next_action(deal: &Deal, _: &ScoringContext) -> Option<Signal> {
    (!deal.has_next_action()).then_some(Signal::labelled(25, "محتاجة خطوة"))
}

fn value(_: &Deal, ctx: &ScoringContext) -> Option<Signal> {
    let value = ctx.normalized_value?;
    if value >= Decimal::from(HIGH_VALUE) {
        Some(Signal::labelled(15, "قيمة عالية"))
    } else if value >= Decimal::from(NOTABLE_VALUE) {
        Some(Signal::silent(8))
    } else {
        None
    }
}

/// A deal worth at least half of what is owed would relieve real pressure.
fn debt_coverage(_: &Deal, ctx: &ScoringContext) -> Option<Signal> {
    let value = ctx.normalized_value?;
    if ctx.outstanding_debt > Decimal::ZERO && value * Decimal::TWO >= ctx.outstanding_debt {
        Some(Signal::labelled(10, "تغطي الديون"))
    } else {
        None
    }
}

/// Runs every rule; returns the clamped score and the reasons in rule order.
pub fn score(deal: &Deal, ctx: &ScoringContext) -> (u8, Vec<String>) {
    let mut total = 0u32;
    let mut reasons = Vec::new();
    for rule in RULES {
        if let Some(signal) = (rule.apply)(deal, ctx) {
            total += signal.points;
            if let Some(reason) = signal.reason {
                reasons.push(reason.to_string());
            }
        }
    }
    (total.min(MAX_SCORE) as u8, reasons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx() -> ScoringContext {
        ScoringContext {
            today: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            normalized_value: Some(Decimal::ZERO),
            outstanding_debt: Decimal::ZERO,
        }
    }

    fn rule(name: &str) -> Rule {
        *RULES.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn schedule_bands() {
        let ctx = ctx();
        let at = |days: i64| {
            let deal = Deal::new("d")
                .with_next_action("call", Some(ctx.today + chrono::Duration::days(days)));
            (rule("schedule").apply)(&deal, &ctx).map(|s| s.points)
        };
        assert_eq!(at(-1), Some(35));
        assert_eq!(at(0), Some(30));
        assert_eq!(at(1), Some(15));
        assert_eq!(at(3), Some(15));
        assert_eq!(at(4), None);
    }

    #[test]
    fn value_uses_normalized_amount() {
        let deal = Deal::new("d");
        let with = |v| ScoringContext {
            normalized_value: v,
            ..ctx()
        };
        let points = |c: ScoringContext| (rule("value").apply)(&deal, &c).map(|s| s.points);
        assert_eq!(points(with(Some(dec!(500000)))), Some(15));
        assert_eq!(points(with(Some(dec!(100000)))), Some(8));
        assert_eq!(points(with(Some(dec!(99999)))), None);
        assert_eq!(points(with(None)), None);
    }

    #[test]
    fn debt_coverage_needs_outstanding_debt() {
        let deal = Deal::new("d");
        let apply = |value, debt| {
            let c = ScoringContext {
                normalized_value: Some(value),
                outstanding_debt: debt,
                ..ctx()
            };
            (rule("debt_coverage").apply)(&deal, &c).is_some()
        };
        assert!(!apply(dec!(1000), dec!(0)));
        assert!(apply(dec!(500), dec!(1000)));
        assert!(!apply(dec!(499), dec!(1000)));
    }

    #[test]
    fn score_is_clamped() {
        let mut deal = Deal::new("d")
            .with_stage(DealStage::AwaitingSignature)
            .with_priority(DealPriority::High);
        deal.next_action_date = Some(ctx().today - chrono::Duration::days(2));
        let c = ScoringContext {
            normalized_value: Some(dec!(1000000)),
            outstanding_debt: dec!(10),
            ..ctx()
        };
        let (score, reasons) = score(&deal, &c);
        assert_eq!(score, 100);
        assert_eq!(
            reasons,
            vec![
                "متأخرة!",
                "أولوية عالية",
                "قربت تتقفل",
                "محتاجة خطوة",
                "قيمة عالية",
                "تغطي الديون"
            ]
        );
    }
}
