//! Priority engine for DealDesk.
//!
//! Given the current deals and debts, decides what to work on now. Every
//! active deal gets a priority score from a fixed rule table
//! ([`rules::RULES`]), a readiness score from its open blockers, a focus band
//! and a suggested next step. Amounts are compared and summed only after
//! conversion to one reference currency.
//!
//! The engine is pure: no I/O, no clock. Callers pass `today`.

pub mod currency;
pub mod debts;
mod engine;
mod error;
pub mod readiness;
pub mod rules;
mod types;

pub use currency::{CurrencyConfig, REFERENCE_CURRENCY, RateTable};
pub use engine::{PriorityEngine, prioritize};
pub use error::{PriorityError, PriorityResult};
pub use readiness::Blocker;
pub use rules::{POLICY_VERSION, Rule, ScoringContext, Signal};
pub use types::{
    CRITICAL_THRESHOLD, DebtOverview, Difficulty, DueDebt, FocusLevel, HIGH_THRESHOLD,
    MEDIUM_THRESHOLD, PrioritizedDeal, PriorityReport, READY_THRESHOLD, Summary,
};
