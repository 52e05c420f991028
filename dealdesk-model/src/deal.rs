//! Deals ("مصالح") and their lifecycle.

use crate::{Record, RecordId, Table, default_currency};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Position of a deal in its lifecycle.
///
/// Stored with the Arabic labels the dashboard shows; the English names are
/// accepted on input as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStage {
    #[serde(rename = "جديد", alias = "new")]
    New,
    #[serde(rename = "بنتكلم", alias = "talking")]
    Talking,
    #[serde(rename = "في تفاوض", alias = "negotiating")]
    Negotiating,
    #[serde(rename = "مستني رد", alias = "awaiting_reply")]
    AwaitingReply,
    #[serde(rename = "مستني توقيع", alias = "awaiting_signature")]
    AwaitingSignature,
    #[serde(rename = "مؤجل", alias = "deferred")]
    Deferred,
    #[serde(rename = "مقفول", alias = "closed")]
    Closed,
    #[serde(rename = "ملغي", alias = "cancelled")]
    Cancelled,
}

impl DealStage {
    pub const ALL: [DealStage; 8] = [
        DealStage::New,
        DealStage::Talking,
        DealStage::Negotiating,
        DealStage::AwaitingReply,
        DealStage::AwaitingSignature,
        DealStage::Deferred,
        DealStage::Closed,
        DealStage::Cancelled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DealStage::New => "جديد",
            DealStage::Talking => "بنتكلم",
            DealStage::Negotiating => "في تفاوض",
            DealStage::AwaitingReply => "مستني رد",
            DealStage::AwaitingSignature => "مستني توقيع",
            DealStage::Deferred => "مؤجل",
            DealStage::Closed => "مقفول",
            DealStage::Cancelled => "ملغي",
        }
    }

    /// Whether deals in this stage are still being worked on.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            DealStage::Deferred | DealStage::Closed | DealStage::Cancelled
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStage::Closed | DealStage::Cancelled)
    }

    /// Allowed stage moves. Deferred and cancelled are side exits from any
    /// stage that is not closed; a deferred deal may resume where it left off.
    pub fn can_transition_to(&self, next: DealStage) -> bool {
        use DealStage::*;
        if *self == next {
            return false;
        }
        match (*self, next) {
            (Closed, _) | (Cancelled, _) => false,
            (_, Deferred) | (_, Cancelled) => true,
            (Deferred, _) => next != Closed,
            (New, Talking)
            | (Talking, Negotiating)
            | (Negotiating, AwaitingReply)
            | (AwaitingReply, AwaitingSignature)
            | (AwaitingSignature, AwaitingReply)
            | (AwaitingSignature, Closed) => true,
            _ => false,
        }
    }
}

/// User-set priority of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DealPriority {
    #[serde(rename = "عالي", alias = "high")]
    High,
    #[default]
    #[serde(rename = "متوسط", alias = "medium")]
    Medium,
    #[serde(rename = "منخفض", alias = "low")]
    Low,
}

/// A person involved in a deal. Contacts are not unique per deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A tracked business opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: RecordId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub deal_type: Option<String>,
    pub stage: DealStage,
    #[serde(default)]
    pub priority: DealPriority,
    #[serde(default)]
    pub expected_value: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub realized_value: Decimal,
    #[serde(default)]
    pub next_action: Option<String>,
    #[serde(default)]
    pub next_action_date: Option<NaiveDate>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    /// A new deal in the `New` stage with medium priority and no value yet.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new_local(),
            name: name.into(),
            deal_type: None,
            stage: DealStage::New,
            priority: DealPriority::Medium,
            expected_value: Decimal::ZERO,
            currency: default_currency(),
            realized_value: Decimal::ZERO,
            next_action: None,
            next_action_date: None,
            contacts: Vec::new(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_stage(mut self, stage: DealStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_priority(mut self, priority: DealPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_value(mut self, amount: Decimal, currency: impl Into<String>) -> Self {
        self.expected_value = amount;
        self.currency = currency.into();
        self
    }

    pub fn with_next_action(mut self, action: impl Into<String>, date: Option<NaiveDate>) -> Self {
        self.next_action = Some(action.into());
        self.next_action_date = date;
        self
    }

    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contacts.push(contact);
        self
    }

    /// True when a non-blank next action is recorded.
    pub fn has_next_action(&self) -> bool {
        self.next_action
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
    }

    pub fn is_active(&self) -> bool {
        self.stage.is_active()
    }
}

impl Record for Deal {
    const TABLE: Table = Table::Deals;
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

    fn check_fields(fields: &Map<String, Value>) -> Result<(), String> {
        match fields.get("expected_value") {
            Some(Value::Number(n)) if n.as_f64().is_some_and(|v| v < 0.0) => {
                Err(format!("expected_value must not be negative, got {n}"))
            }
            Some(Value::String(s)) if s.trim_start().starts_with('-') => {
                Err(format!("expected_value must not be negative, got {s}"))
            }
            _ => Ok(()),
        }
    }
}
