//! Radar Ingest Library
//!
//! Moves radar readings from a locally written text file into a store:
//! - Ingest loop that re-reads the file's last `angle,distance` line every poll
//! - Deduplication against the last accepted line
//! - MongoDB (connection string), document store (HTTP data API) and SQLite backends
//! - Query API serving latest, recent, and paginated readings
//!
//! # Example
//!
//! ```ignore
//! use radar_ingest::{IngestLoop, SchedulePolicy, SourceFile, SqliteStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(SqliteStore::new("radar.db").await?);
//!     let mut ingest = IngestLoop::new(SourceFile::new("radar_data.txt"), store, SchedulePolicy::default());
//!     println!("{}", ingest.poll_once().await?);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod config;
pub mod store;
pub mod ingest;
pub mod server;
pub mod cli;

// Re-export commonly used types for convenience
pub use types::{Reading, Clock, SystemClock};

pub use config::Config;

pub use store::{
    ReadingStore,
    DocumentStore,
    MongoStore,
    SqliteStore,
};

pub use ingest::{
    IngestLoop,
    IngestError,
    PollOutcome,
    SchedulePolicy,
    SourceFile,
};

pub use server::{
    ServerState,
    start as start_server,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
