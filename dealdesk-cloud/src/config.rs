//! Remote store configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the hosted data store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloudConfig {
    /// Project URL, e.g. "https://abc.supabase.co". The REST API lives
    /// under `/rest/v1`.
    pub base_url: String,

    /// Public API key, sent both as `apikey` and as the bearer token.
    pub api_key: String,

    /// Per-request timeout in seconds. A timed-out request counts as the
    /// store being unreachable.
    pub timeout_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            timeout_secs: 15,
        }
    }
}

impl CloudConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub(crate) fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url.trim_end_matches('/'))
    }
}
