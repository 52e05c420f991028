//! PostgREST-style gateway.
//!
//! Every table is exposed at `/rest/v1/{table}`. Rows are filtered with
//! `id=eq.{id}`, and writes ask for the stored row back with
//! `Prefer: return=representation`. Inserts also send
//! `resolution=merge-duplicates` so repeating a create with the same
//! client-supplied id updates the existing row instead of failing.

use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use async_trait::async_trait;
use dealdesk_model::{RecordId, Table};
use dealdesk_sync::{GatewayError, GatewayResult, RemoteGateway};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const RETURN_ROWS: &str = "return=representation";
const UPSERT_ROWS: &str = "return=representation,resolution=merge-duplicates";

/// HTTP client for the hosted store.
pub struct RestGateway {
    client: Client,
    config: CloudConfig,
}

impl RestGateway {
    pub fn new(config: CloudConfig) -> CloudResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(CloudError::Config("base_url is empty".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    fn request(&self, method: reqwest::Method, table: Table) -> RequestBuilder {
        self.client
            .request(method, self.config.table_url(table.as_str()))
            .header("apikey", self.config.api_key.as_str())
            .bearer_auth(&self.config.api_key)
    }

    async fn rows(&self, builder: RequestBuilder) -> CloudResult<Vec<Value>> {
        let resp = check_status(builder.send().await?).await?;
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body)? {
            Value::Array(rows) => Ok(rows),
            row @ Value::Object(_) => Ok(vec![row]),
            other => Err(CloudError::UnexpectedBody(format!("expected rows, got {other}"))),
        }
    }
}

/// Turns a non-success response into [`CloudError::Status`], using the
/// store's error message when it sends one.
async fn check_status(resp: Response) -> CloudResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or(body);
    Err(CloudError::Status {
        status: status.as_u16(),
        message,
    })
}

fn id_filter(id: &RecordId) -> (&'static str, String) {
    ("id", format!("eq.{id}"))
}

fn first_row(rows: Vec<Value>, what: &str) -> GatewayResult<Value> {
    rows.into_iter()
        .next()
        .ok_or_else(|| GatewayError::Decode(format!("{what} returned no row")))
}

#[async_trait]
impl RemoteGateway for RestGateway {
    async fn select(&self, table: Table) -> GatewayResult<Vec<Value>> {
        debug!(%table, "GET rows");
        let req = self
            .request(reqwest::Method::GET, table)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        Ok(self.rows(req).await?)
    }

    async fn select_by_id(&self, table: Table, id: &RecordId) -> GatewayResult<Option<Value>> {
        let req = self
            .request(reqwest::Method::GET, table)
            .query(&[("select", "*".to_string()), id_filter(id)]);
        Ok(self.rows(req).await?.into_iter().next())
    }

    async fn insert(&self, table: Table, record: &Value) -> GatewayResult<Value> {
        debug!(%table, "POST row");
        let req = self
            .request(reqwest::Method::POST, table)
            .header("Prefer", UPSERT_ROWS)
            .json(record);
        first_row(self.rows(req).await?, "insert")
    }

    async fn update(&self, table: Table, id: &RecordId, patch: &Value) -> GatewayResult<Value> {
        debug!(%table, %id, "PATCH row");
        let req = self
            .request(reqwest::Method::PATCH, table)
            .query(&[id_filter(id)])
            .header("Prefer", RETURN_ROWS)
            .json(patch);
        self.rows(req)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn delete(&self, table: Table, id: &RecordId) -> GatewayResult<()> {
        debug!(%table, %id, "DELETE row");
        let req = self
            .request(reqwest::Method::DELETE, table)
            .query(&[id_filter(id)])
            .header("Prefer", RETURN_ROWS);
        if self.rows(req).await?.is_empty() {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
