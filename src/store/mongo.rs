//! MongoDB reading store
//!
//! Connects with a standard connection string (`mongodb://` or
//! `mongodb+srv://`). The client keeps its own connection pool, so one
//! `MongoStore` is built at startup and shared by every poll cycle and
//! request handler.

use anyhow::{bail, Context, Result};
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use std::time::Duration;
use tracing::debug;

use super::ReadingStore;
use crate::config::DocumentStoreConfig;
use crate::types::Reading;

/// MongoDB-backed reading store
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
    readings: Collection<Reading>,
}

impl MongoStore {
    /// Parse the connection string and build the client. No round trip
    /// happens here; the first operation (or `ping`) connects.
    pub async fn connect(config: &DocumentStoreConfig) -> Result<Self> {
        let uri = config.uri.as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .context("MongoDB connection string not configured (set RADAR_STORE_URI or store.document.uri)")?;
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            bail!("Connection string must start with mongodb:// or mongodb+srv://");
        }

        let mut options = ClientOptions::parse(uri).await
            .context("Invalid MongoDB connection string")?;
        let timeout = Duration::from_secs(config.timeout_secs);
        options.app_name = Some("radar-ingest".to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options)
            .context("Failed to create MongoDB client")?;
        let database = client.database(&config.database);
        let readings = database.collection::<Reading>(&config.collection);
        debug!("MongoDB client ready for {}.{}", config.database, config.collection);

        Ok(Self { database, readings })
    }

    fn newest_first() -> Document {
        doc! { "timestamp": -1, "_id": -1 }
    }
}

#[async_trait::async_trait]
impl ReadingStore for MongoStore {
    async fn insert(&self, reading: &Reading) -> Result<()> {
        self.readings.insert_one(reading).await
            .context("insertOne failed")?;
        Ok(())
    }

    async fn latest(&self) -> Result<Option<Reading>> {
        let reading = self.readings
            .find_one(doc! {})
            .sort(Self::newest_first())
            .await
            .context("find latest failed")?;
        Ok(reading)
    }

    async fn page(&self, skip: usize, limit: usize) -> Result<Vec<Reading>> {
        // A zero limit means "no limit" to the server
        if limit == 0 {
            return Ok(Vec::new());
        }
        let cursor = self.readings
            .find(doc! {})
            .sort(Self::newest_first())
            .skip(u64::try_from(skip).unwrap_or(u64::MAX))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .context("find failed")?;
        let readings: Vec<Reading> = cursor.try_collect().await
            .context("Failed to read find cursor")?;
        Ok(readings)
    }

    async fn count(&self) -> Result<u64> {
        let count = self.readings.count_documents(doc! {}).await
            .context("countDocuments failed")?;
        Ok(count)
    }

    async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mongo"
    }
}
