use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::config::InfluxConfig;

use super::flux_csv::decode_flux_csv;
use super::query_executor_trait::{QueryExecutor, RecordStream};
use super::store_error::StoreError;

/// Query executor backed by the InfluxDB v2 HTTP API.
///
/// `reqwest::Client` pools connections internally, so one instance is shared
/// by all handlers.
pub struct InfluxQueryExecutor {
    client: Client,
    query_url: String,
    token: String,
    org: String,
}

#[derive(Deserialize)]
struct InfluxErrorBody {
    message: String,
}

impl InfluxQueryExecutor {
    pub fn new(cfg: &InfluxConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            query_url: query_url(&cfg.url),
            token: cfg.token.clone(),
            org: cfg.org.clone(),
        })
    }
}

fn query_url(base: &str) -> String {
    format!("{}/api/v2/query", base.trim_end_matches('/'))
}

fn request_body(query: &str) -> Value {
    json!({
        "query": query,
        "type": "flux",
        "dialect": {
            "header": true,
            "delimiter": ",",
            "annotations": ["datatype", "group", "default"],
            "commentPrefix": "#",
            "dateTimeFormat": "RFC3339",
        },
    })
}

/// Prefers the `message` field of a JSON error body, falls back to the raw text.
fn error_message(text: &str) -> String {
    serde_json::from_str::<InfluxErrorBody>(text)
        .map(|b| b.message)
        .unwrap_or_else(|_| text.trim().to_string())
}

#[async_trait]
impl QueryExecutor for InfluxQueryExecutor {
    async fn execute(&self, query: &str) -> Result<RecordStream, StoreError> {
        debug!(url = %self.query_url, "Executing Flux query");

        let resp = self
            .client
            .post(&self.query_url)
            .query(&[("org", self.org.as_str())])
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(ACCEPT, "application/csv")
            .json(&request_body(query))
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(StoreError::Query {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        Ok(decode_flux_csv(resp.bytes_stream()))
    }
}
