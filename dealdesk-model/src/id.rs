//! Record identifiers.
//!
//! A record created while offline gets a client-generated [`RecordId::Local`]
//! id. Once the remote store accepts the record it answers with its canonical
//! id, which is always a [`RecordId::Remote`]. Local ids serialize with a
//! `local:` prefix so the distinction survives a round trip through the cache.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const LOCAL_PREFIX: &str = "local:";

/// Identifier of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    /// Client-generated id, not yet confirmed by the remote store.
    Local(Uuid),
    /// Canonical id assigned (or accepted) by the remote store.
    Remote(String),
}

impl RecordId {
    /// Generates a fresh local id.
    pub fn new_local() -> Self {
        Self::Local(Uuid::new_v4())
    }

    pub fn remote(id: impl Into<String>) -> Self {
        Self::Remote(id.into())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// The id sent to the remote store on create.
    ///
    /// Local ids are offered as their bare UUID so the remote store can keep
    /// them verbatim; repeating a create with the same key must be harmless.
    pub fn client_key(&self) -> String {
        match self {
            Self::Local(uuid) => uuid.to_string(),
            Self::Remote(id) => id.clone(),
        }
    }

    /// Parses a stored id. Anything that is not a well-formed local id is a
    /// remote id.
    pub fn parse(raw: &str) -> Self {
        raw.strip_prefix(LOCAL_PREFIX)
            .and_then(|rest| Uuid::parse_str(rest).ok())
            .map(Self::Local)
            .unwrap_or_else(|| Self::Remote(raw.to_string()))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(uuid) => write!(f, "{LOCAL_PREFIX}{uuid}"),
            Self::Remote(id) => f.write_str(id),
        }
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts a string or an integer id (some remote tables use serial keys).
impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de;

        struct RecordIdVisitor;
        impl de::Visitor<'_> for RecordIdVisitor {
            type Value = RecordId;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string or integer record id")
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<RecordId, E> {
                Ok(RecordId::parse(v))
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RecordId, E> {
                Ok(RecordId::Remote(v.to_string()))
            }
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RecordId, E> {
                Ok(RecordId::Remote(v.to_string()))
            }
        }
        deserializer.deserialize_any(RecordIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_id_round_trips_through_display() {
        let id = RecordId::new_local();
        let text = id.to_string();
        assert!(text.starts_with("local:"));
        assert_eq!(RecordId::parse(&text), id);
    }

    #[test]
    fn malformed_local_prefix_is_remote() {
        assert_eq!(
            RecordId::parse("local:not-a-uuid"),
            RecordId::Remote("local:not-a-uuid".into())
        );
    }

    #[test]
    fn client_key_strips_prefix() {
        let uuid = Uuid::new_v4();
        assert_eq!(RecordId::Local(uuid).client_key(), uuid.to_string());
        assert_eq!(RecordId::remote("42").client_key(), "42");
    }

    #[test]
    fn deserializes_integer_ids() {
        let id: RecordId = serde_json::from_str("17").unwrap();
        assert_eq!(id, RecordId::remote("17"));
    }
}
