//! Ranking of active deals.

use crate::currency::{RateTable, normalize_currency_code};
use crate::debts;
use crate::readiness;
use crate::rules::{self, POLICY_VERSION, ScoringContext};
use crate::types::{Difficulty, FocusLevel, PrioritizedDeal, PriorityReport, Summary};
use chrono::NaiveDate;
use dealdesk_model::{Deal, Debt};
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Stateless scorer bound to one rate table.
#[derive(Debug, Clone, Default)]
pub struct PriorityEngine {
    rates: RateTable,
}

impl PriorityEngine {
    pub fn new(rates: RateTable) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// Annotates a single deal. `outstanding_debt` is the unpaid debt total
    /// in the reference currency.
    pub fn evaluate(
        &self,
        deal: &Deal,
        outstanding_debt: Decimal,
        today: NaiveDate,
    ) -> PrioritizedDeal {
        // Rows written outside this core may carry a negative value.
        let value = deal.expected_value.max(Decimal::ZERO);
        let ctx = ScoringContext {
            today,
            normalized_value: self.rates.to_reference(value, &deal.currency),
            outstanding_debt,
        };
        let (priority_score, priority_reasons) = rules::score(deal, &ctx);
        let blockers = readiness::blockers(deal);

        PrioritizedDeal {
            deal: deal.clone(),
            priority_score,
            priority_reasons,
            focus_level: FocusLevel::from_score(priority_score),
            suggested_action: readiness::suggested_action(deal, &blockers),
            blockers: blockers.iter().map(|b| b.label().to_string()).collect(),
            execution_difficulty: readiness::difficulty(deal, &blockers),
            readiness_score: readiness::readiness_score(&blockers),
            normalized_value: ctx.normalized_value,
        }
    }

    /// Scores every active deal and builds the dashboard view. Deferred,
    /// closed and cancelled deals are left out entirely.
    pub fn report(&self, deals: &[Deal], debts: &[Debt], today: NaiveDate) -> PriorityReport {
        let debts = debts::overview(debts, &self.rates, today);

        let mut ranked: Vec<PrioritizedDeal> = deals
            .iter()
            .filter(|d| d.is_active())
            .map(|d| self.evaluate(d, debts.outstanding_total, today))
            .collect();
        ranked.sort_by(rank_order);

        let mut summary = Summary {
            total_deals: ranked.len(),
            ..Summary::default()
        };
        for p in &ranked {
            match p.normalized_value {
                Some(value) => summary.total_value += value,
                None => {
                    summary
                        .unconverted_currencies
                        .insert(normalize_currency_code(&p.deal.currency));
                }
            }
            if p.focus_level == FocusLevel::Critical {
                summary.critical_count += 1;
            }
            if p.needs_attention() {
                summary.needs_attention_count += 1;
            }
        }

        let pick = |keep: fn(&PrioritizedDeal) -> bool| -> Vec<PrioritizedDeal> {
            ranked.iter().filter(|p| keep(p)).cloned().collect()
        };
        let blocked_deals = pick(PrioritizedDeal::is_blocked);
        let easy_wins = pick(|p| p.execution_difficulty == Difficulty::Easy && p.is_ready());
        let critical_deals = pick(|p| p.focus_level == FocusLevel::Critical);

        PriorityReport {
            focus_now: ranked.first().cloned(),
            top_priorities: ranked,
            blocked_deals,
            easy_wins,
            critical_deals,
            summary,
            debts,
            reference_currency: self.rates.reference().to_string(),
            policy_version: POLICY_VERSION,
        }
    }
}

/// Score first, then value, then name; the id makes the order total.
fn rank_order(a: &PrioritizedDeal, b: &PrioritizedDeal) -> Ordering {
    let value = |p: &PrioritizedDeal| p.normalized_value.unwrap_or(Decimal::ZERO);
    b.priority_score
        .cmp(&a.priority_score)
        .then_with(|| value(b).cmp(&value(a)))
        .then_with(|| a.deal.name.cmp(&b.deal.name))
        .then_with(|| a.deal.id.to_string().cmp(&b.deal.id.to_string()))
}

/// Ranks with the built-in rate table.
pub fn prioritize(deals: &[Deal], debts: &[Debt], today: NaiveDate) -> PriorityReport {
    PriorityEngine::default().report(deals, debts, today)
}
