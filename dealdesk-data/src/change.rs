//! Change notifications.
//!
//! Every write emits a [`DataChange`] so views holding query results (the
//! dashboard included) know to re-read. Completed sync passes are forwarded
//! as [`ChangeKind::Synced`] for each table they touched.

use dealdesk_model::{RecordId, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    /// A sync pass replaced cached data for the table.
    Synced,
}

/// One invalidation notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChange {
    pub table: Table,
    /// The affected record, `None` when the whole table changed.
    pub id: Option<RecordId>,
    pub kind: ChangeKind,
}

impl DataChange {
    pub(crate) fn record(table: Table, id: RecordId, kind: ChangeKind) -> Self {
        Self {
            table,
            id: Some(id),
            kind,
        }
    }

    pub(crate) fn table(table: Table, kind: ChangeKind) -> Self {
        Self {
            table,
            id: None,
            kind,
        }
    }
}
