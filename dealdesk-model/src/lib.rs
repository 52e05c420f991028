//! Entity model for DealDesk.
//!
//! Every record the dashboard tracks is a plain serde type keyed by a
//! [`RecordId`]. Records are stored locally and remotely as JSON objects, so
//! field names here are the wire names used by the remote table API.
//!
//! # Records
//!
//! - [`Deal`]: a business opportunity moving through [`DealStage`]s
//! - [`Debt`]: a liability with a pressure level
//! - [`Job`]: recurring income
//! - [`Call`], [`Task`], [`CalendarEvent`], [`DealFile`]: activity attached to a deal
//! - [`DailyMove`]: a task bound to a single day

mod activity;
mod deal;
mod debt;
mod id;
mod job;
mod record;
mod table;

pub use activity::{CalendarEvent, Call, DailyMove, DealFile, Task};
pub use deal::{Contact, Deal, DealPriority, DealStage};
pub use debt::{Debt, PressureLevel};
pub use id::RecordId;
pub use job::Job;
pub use record::Record;
pub use table::{Table, UnknownTable};

/// Currency used when a record does not carry one.
pub const DEFAULT_CURRENCY: &str = "EGP";

pub(crate) fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}
