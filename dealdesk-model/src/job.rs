use crate::{Record, RecordId, Table, default_currency};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A recurring job or income source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub monthly_income: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Day of month the income arrives on.
    #[serde(default)]
    pub pay_day: Option<u8>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn active_by_default() -> bool {
    true
}

impl Job {
    pub fn new(name: impl Into<String>, monthly_income: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new_local(),
            name: name.into(),
            monthly_income,
            currency: default_currency(),
            pay_day: None,
            is_active: true,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for Job {
    const TABLE: Table = Table::Jobs;
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
    }
}
