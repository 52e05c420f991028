//! Activity records: calls, tasks, calendar events, files and daily moves.
//!
//! These hang off a deal through `deal_id` but never modify the deal itself.
//! Deleting a deal cascades to them in the remote store, not here.

use crate::{Record, RecordId, Table};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A logged phone call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: RecordId,
    #[serde(default)]
    pub deal_id: Option<RecordId>,
    pub contact_name: String,
    pub call_date: DateTime<Utc>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Call {
    pub fn new(contact_name: impl Into<String>, deal_id: Option<RecordId>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new_local(),
            deal_id,
            contact_name: contact_name.into(),
            call_date: now,
            summary: None,
            outcome: None,
            created_at: now,
        }
    }
}

/// A to-do item, optionally tied to a deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: RecordId,
    #[serde(default)]
    pub deal_id: Option<RecordId>,
    pub title: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: impl Into<String>, deal_id: Option<RecordId>) -> Self {
        Self {
            id: RecordId::new_local(),
            deal_id,
            title: title.into(),
            due_date: None,
            is_completed: false,
            created_at: Utc::now(),
        }
    }
}

/// A meeting or other dated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: RecordId,
    #[serde(default)]
    pub deal_id: Option<RecordId>,
    pub title: String,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, event_date: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new_local(),
            deal_id: None,
            title: title.into(),
            event_date,
            location: None,
            notes: None,
            created_at: Utc::now(),
        }
    }
}

/// A document attached to a deal. The file body lives elsewhere; only its
/// location is tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealFile {
    pub id: RecordId,
    pub deal_id: RecordId,
    pub file_name: String,
    pub file_url: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl DealFile {
    pub fn new(deal_id: RecordId, file_name: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            id: RecordId::new_local(),
            deal_id,
            file_name: file_name.into(),
            file_url: file_url.into(),
            file_type: None,
            created_at: Utc::now(),
        }
    }
}

/// A task for one calendar day. `priority` is a rank, lower comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMove {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub deal_id: Option<RecordId>,
    #[serde(default)]
    pub priority: i32,
    pub move_date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl DailyMove {
    /// A move for `today` (the caller's local calendar date).
    pub fn new(title: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            id: RecordId::new_local(),
            title: title.into(),
            deal_id: None,
            priority: 0,
            move_date: today,
            is_completed: false,
            created_at: Utc::now(),
        }
    }
}

macro_rules! impl_activity_record {
    ($ty:ty, $table:expr, |$rec:ident| $deal:expr) => {
        impl Record for $ty {
            const TABLE: Table = $table;

            fn id(&self) -> &RecordId {
                &self.id
            }

            fn set_id(&mut self, id: RecordId) {
                self.id = id;
            }

            fn on_create(&mut self, now: DateTime<Utc>) {
                self.created_at = now;
            }

            fn deal_id(&self) -> Option<&RecordId> {
                let $rec = self;
                $deal
            }
        }
    };
}

impl_activity_record!(Call, Table::Calls, |r| r.deal_id.as_ref());
impl_activity_record!(Task, Table::Tasks, |r| r.deal_id.as_ref());
impl_activity_record!(CalendarEvent, Table::Events, |r| r.deal_id.as_ref());
impl_activity_record!(DealFile, Table::Files, |r| Some(&r.deal_id));
impl_activity_record!(DailyMove, Table::DailyMoves, |r| r.deal_id.as_ref());
