use crate::{RecordId, Table};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A storable entity bound to one [`Table`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: Table;

    /// Whether the record carries an `updated_at` field that edits refresh.
    const TRACKS_UPDATES: bool = false;

    fn id(&self) -> &RecordId;

    fn set_id(&mut self, id: RecordId);

    /// Fills in creation defaults (timestamps, derived fields) on a record
    /// that is about to be stored for the first time.
    fn on_create(&mut self, _now: DateTime<Utc>) {}

    /// Checks the fields of a new record or an update patch against the
    /// entity's invariants. Fields the patch leaves out are not checked.
    fn check_fields(_fields: &Map<String, Value>) -> Result<(), String> {
        Ok(())
    }

    /// The deal this record belongs to, if any.
    fn deal_id(&self) -> Option<&RecordId> {
        None
    }
}
