//! Helpers for the `id` and `*_id` fields of stored JSON records.

use crate::error::{StorageError, StorageResult};
use serde_json::Value;

/// Reads the record key from a JSON object. Integer ids are accepted.
pub(crate) fn record_key(value: &Value) -> StorageResult<String> {
    match value.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(StorageError::MissingId),
    }
}

/// Replaces every top-level `id` / `*_id` string field equal to `old` with
/// `new`. Returns whether anything changed.
pub(crate) fn replace_id_refs(value: &mut Value, old: &str, new: &str) -> bool {
    let Some(map) = value.as_object_mut() else {
        return false;
    };
    let mut changed = false;
    for (key, field) in map.iter_mut() {
        if (key == "id" || key.ends_with("_id")) && field.as_str() == Some(old) {
            *field = Value::String(new.to_string());
            changed = true;
        }
    }
    changed
}

/// Lists the values of the top-level `*_id` reference fields (not `id`).
pub(crate) fn referenced_ids(value: &Value) -> Vec<&str> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(key, _)| key.ends_with("_id"))
                .filter_map(|(_, v)| v.as_str())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_id_is_a_key() {
        assert_eq!(record_key(&json!({"id": 7})).unwrap(), "7");
    }

    #[test]
    fn missing_id_is_an_error() {
        assert!(matches!(
            record_key(&json!({"name": "x"})),
            Err(StorageError::MissingId)
        ));
    }

    #[test]
    fn replaces_only_id_fields() {
        let mut v = json!({"id": "a", "deal_id": "a", "name": "a"});
        assert!(replace_id_refs(&mut v, "a", "b"));
        assert_eq!(v, json!({"id": "b", "deal_id": "b", "name": "a"}));
    }

    #[test]
    fn referenced_ids_skip_own_id() {
        let v = json!({"id": "a", "deal_id": "d", "other": "x"});
        assert_eq!(referenced_ids(&v), vec!["d"]);
    }
}
