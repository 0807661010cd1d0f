//! Reading stores
//!
//! Supported backends:
//! - Mongo: MongoDB reached with a connection string (production)
//! - Document: remote document store over its HTTP data API
//! - SQLite: local database file (development, tests)

pub mod document;
pub mod mongo;
pub mod sqlite;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::{StoreBackend, StoreConfig};
use crate::types::Reading;

pub use document::DocumentStore;
pub use mongo::MongoStore;
pub use sqlite::SqliteStore;

/// Common trait for reading stores
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    /// Insert one reading unconditionally
    async fn insert(&self, reading: &Reading) -> Result<()>;

    /// Newest reading by timestamp
    async fn latest(&self) -> Result<Option<Reading>>;

    /// Readings sorted newest first, skipping `skip`
    async fn page(&self, skip: usize, limit: usize) -> Result<Vec<Reading>>;

    /// The newest `limit` readings, returned oldest first
    async fn recent(&self, limit: usize) -> Result<Vec<Reading>> {
        let mut readings = self.page(0, limit).await?;
        readings.reverse();
        Ok(readings)
    }

    /// Total number of stored readings
    async fn count(&self) -> Result<u64>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Open the configured store. The handle is created once and reused.
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn ReadingStore>> {
    let store: Arc<dyn ReadingStore> = match config.backend {
        StoreBackend::Mongo => Arc::new(MongoStore::connect(&config.document).await?),
        StoreBackend::Document => Arc::new(DocumentStore::new(&config.document)?),
        StoreBackend::Sqlite => Arc::new(SqliteStore::new(config.sqlite_path()?).await?),
    };
    info!("Using {} store", store.name());
    Ok(store)
}
