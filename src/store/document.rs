//! Remote document store integration
//!
//! Talks to a document database through its HTTP data API. Every call is a
//! POST to `{endpoint}/action/{name}` with a JSON body naming the data source,
//! database and collection, authenticated with an `api-key` header.
//!
//! Actions used:
//! - `insertOne`: persist one reading
//! - `find`: latest / paged queries sorted by `timestamp`
//! - `aggregate`: `$count` for pagination totals

use anyhow::{Result, Context, bail};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::ReadingStore;
use crate::config::DocumentStoreConfig;
use crate::types::Reading;

/// Document store client
#[derive(Debug, Clone)]
pub struct DocumentStore {
    http: Client,
    endpoint: String,
    api_key: String,
    data_source: String,
    database: String,
    collection: String,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    documents: Vec<Reading>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    #[serde(default)]
    documents: Vec<CountDocument>,
}

#[derive(Debug, Deserialize)]
struct CountDocument {
    total: u64,
}

impl DocumentStore {
    /// Create a new client. The HTTP connection pool is shared by every call.
    pub fn new(config: &DocumentStoreConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            bail!("Document store endpoint not configured (store.document.endpoint)");
        }
        let api_key = config.api_key.clone()
            .filter(|k| !k.is_empty())
            .context("Document store API key not configured (set RADAR_STORE_API_KEY)")?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            data_source: config.data_source.clone(),
            database: config.database.clone(),
            collection: config.collection.clone(),
        })
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/action/{}", self.endpoint, action)
    }

    /// Body shared by every action, extended with action-specific fields
    fn request_body(&self, extra: Value) -> Value {
        let mut body = json!({
            "dataSource": self.data_source,
            "database": self.database,
            "collection": self.collection,
        });
        if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
            body.extend(extra);
        }
        body
    }

    async fn call(&self, action: &str, extra: Value) -> Result<Value> {
        let response = self.http
            .post(self.action_url(action))
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&self.request_body(extra))
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", action))?;

        if response.status().is_success() {
            let value = response.json::<Value>().await
                .with_context(|| format!("Invalid {} response", action))?;
            debug!("Document store {} ok", action);
            Ok(value)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Document store {} failed: {} - {}", action, status, body)
        }
    }

    async fn find(&self, skip: usize, limit: usize) -> Result<Vec<Reading>> {
        let value = self.call("find", json!({
            "filter": {},
            "sort": { "timestamp": -1 },
            "skip": skip,
            "limit": limit,
        })).await?;
        let response: FindResponse = serde_json::from_value(value)
            .context("Unexpected find response")?;
        Ok(response.documents)
    }
}

#[async_trait::async_trait]
impl ReadingStore for DocumentStore {
    async fn insert(&self, reading: &Reading) -> Result<()> {
        self.call("insertOne", json!({ "document": reading })).await?;
        Ok(())
    }

    async fn latest(&self) -> Result<Option<Reading>> {
        Ok(self.find(0, 1).await?.into_iter().next())
    }

    async fn page(&self, skip: usize, limit: usize) -> Result<Vec<Reading>> {
        self.find(skip, limit).await
    }

    async fn count(&self) -> Result<u64> {
        let value = self.call("aggregate", json!({
            "pipeline": [ { "$count": "total" } ],
        })).await?;
        let response: CountResponse = serde_json::from_value(value)
            .context("Unexpected aggregate response")?;
        // $count emits no document for an empty collection
        Ok(response.documents.first().map(|d| d.total).unwrap_or(0))
    }

    async fn ping(&self) -> Result<()> {
        self.find(0, 1).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "document"
    }
}
