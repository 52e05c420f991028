//! Output types of the priority engine. None of these are persisted; a report
//! is recomputed from the current deal and debt collections on every read.

use chrono::NaiveDate;
use dealdesk_model::{Deal, RecordId};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;

/// Lower bound of the critical band.
pub const CRITICAL_THRESHOLD: u8 = 80;
/// Lower bound of the high band.
pub const HIGH_THRESHOLD: u8 = 60;
/// Lower bound of the medium band.
pub const MEDIUM_THRESHOLD: u8 = 35;
/// Readiness at or above which a deal counts as ready to execute.
pub const READY_THRESHOLD: u8 = 70;

/// Coarse band of a priority score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl FocusLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= CRITICAL_THRESHOLD => FocusLevel::Critical,
            s if s >= HIGH_THRESHOLD => FocusLevel::High,
            s if s >= MEDIUM_THRESHOLD => FocusLevel::Medium,
            _ => FocusLevel::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A deal annotated with everything the dashboard needs to rank it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrioritizedDeal {
    #[serde(flatten)]
    pub deal: Deal,
    pub priority_score: u8,
    pub priority_reasons: Vec<String>,
    pub focus_level: FocusLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    pub blockers: Vec<String>,
    pub execution_difficulty: Difficulty,
    pub readiness_score: u8,
    /// Expected value in the reference currency; `None` when the deal's
    /// currency has no known rate.
    pub normalized_value: Option<Decimal>,
}

impl PrioritizedDeal {
    pub fn is_blocked(&self) -> bool {
        !self.blockers.is_empty()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness_score >= READY_THRESHOLD
    }

    pub fn needs_attention(&self) -> bool {
        self.is_blocked() || !self.is_ready()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_deals: usize,
    /// Sum of normalized expected values, in the reference currency.
    pub total_value: Decimal,
    pub critical_count: usize,
    pub needs_attention_count: usize,
    /// Currencies of deals left out of `total_value` for lack of a rate.
    pub unconverted_currencies: BTreeSet<String>,
}

/// The unpaid debt due soonest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueDebt {
    pub id: RecordId,
    pub creditor_name: String,
    pub due_date: NaiveDate,
    pub remaining: Decimal,
    pub currency: String,
}

/// Aggregate view over unpaid debts, amounts in the reference currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebtOverview {
    pub outstanding_total: Decimal,
    pub monthly_payments: Decimal,
    pub high_pressure_count: usize,
    pub nearest_due: Option<DueDebt>,
    pub unconverted_currencies: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityReport {
    /// Active deals, best first.
    pub top_priorities: Vec<PrioritizedDeal>,
    pub focus_now: Option<PrioritizedDeal>,
    pub blocked_deals: Vec<PrioritizedDeal>,
    pub easy_wins: Vec<PrioritizedDeal>,
    pub critical_deals: Vec<PrioritizedDeal>,
    pub summary: Summary,
    pub debts: DebtOverview,
    pub reference_currency: String,
    pub policy_version: u32,
}
