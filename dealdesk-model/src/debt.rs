//! Debts and repayment pressure.

use crate::{Record, RecordId, Table, default_currency};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How hard a debt presses on cash flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PressureLevel {
    #[serde(rename = "عالي", alias = "high")]
    High,
    #[serde(rename = "متوسط", alias = "medium")]
    Medium,
    #[serde(rename = "خفيف", alias = "light")]
    Light,
}

/// A liability.
///
/// `remaining_amount` is expected to stay at or below `amount`; a paid debt
/// has nothing remaining regardless of what is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: RecordId,
    pub creditor_name: String,
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub monthly_payment: Decimal,
    #[serde(default)]
    pub remaining_amount: Option<Decimal>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub pressure_level: Option<PressureLevel>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Debt {
    pub fn new(creditor_name: impl Into<String>, amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new_local(),
            creditor_name: creditor_name.into(),
            amount,
            currency: default_currency(),
            monthly_payment: Decimal::ZERO,
            remaining_amount: None,
            due_date: None,
            pressure_level: None,
            is_paid: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Outstanding balance: zero when paid, otherwise the remaining amount,
    /// falling back to the full amount when none was recorded.
    pub fn remaining(&self) -> Decimal {
        if self.is_paid {
            Decimal::ZERO
        } else {
            self.remaining_amount.unwrap_or(self.amount)
        }
    }

    /// The user-set pressure level, or one derived from the due date.
    pub fn effective_pressure(&self, today: NaiveDate) -> PressureLevel {
        if let Some(level) = self.pressure_level {
            return level;
        }
        match self.due_date {
            Some(due) if (due - today).num_days() <= 7 => PressureLevel::High,
            Some(due) if (due - today).num_days() <= 30 => PressureLevel::Medium,
            _ => PressureLevel::Light,
        }
    }
}

impl Record for Debt {
    const TABLE: Table = Table::Debts;
    const TRACKS_UPDATES: bool = true;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn on_create(&mut self, now: DateTime<Utc>) {
        self.created_at = now;
        self.updated_at = now;
        if self.remaining_amount.is_none() {
            self.remaining_amount = Some(self.amount);
        }
    }
}
