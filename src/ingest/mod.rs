//! Ingest loop - tails the sensor file into the reading store
//!
//! Each poll re-reads the source file, takes its last line and, when that
//! line differs from the last accepted one, parses it into a [`Reading`]
//! and inserts it. Failed polls are logged and retried after a fixed delay,
//! forever.

pub mod parse;
pub mod source;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn, error, debug};

use crate::config::ScheduleConfig;
use crate::store::ReadingStore;
use crate::types::{Clock, Reading, SystemClock};

use parse::{Field, NumberError};
pub use source::SourceFile;

/// A failed poll cycle. Every variant is handled the same way: log, wait
/// the error delay, poll again.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {field} in line '{line}': {source}")]
    Parse {
        field: Field,
        line: String,
        #[source]
        source: NumberError,
    },
    #[error("failed to insert {reading}: {cause:#}")]
    Store {
        reading: Reading,
        cause: anyhow::Error,
    },
}

/// Result of a successful poll cycle
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// File has no lines
    Empty,
    /// Last line equals the last accepted line
    Unchanged,
    /// Last line does not have exactly two fields; skipped, not remembered
    Malformed { fields: usize },
    /// A new reading was stored
    Inserted(Reading),
}

impl std::fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollOutcome::Empty => write!(f, "Empty"),
            PollOutcome::Unchanged => write!(f, "Unchanged"),
            PollOutcome::Malformed { fields } => write!(f, "Malformed ({} fields)", fields),
            PollOutcome::Inserted(r) => write!(f, "Inserted: {}", r),
        }
    }
}

/// Fixed-interval poll and fixed-interval error retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    pub poll_interval: Duration,
    pub error_delay: Duration,
}

impl SchedulePolicy {
    /// Delay before the next poll given the result of this one
    pub fn delay_after<T, E>(&self, result: &Result<T, E>) -> Duration {
        match result {
            Ok(_) => self.poll_interval,
            Err(_) => self.error_delay,
        }
    }
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        ScheduleConfig::default().into()
    }
}

impl From<ScheduleConfig> for SchedulePolicy {
    fn from(config: ScheduleConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            error_delay: config.error_delay(),
        }
    }
}

/// The ingest loop. Owns the single "last accepted line" slot.
pub struct IngestLoop {
    source: SourceFile,
    store: Arc<dyn ReadingStore>,
    clock: Arc<dyn Clock>,
    policy: SchedulePolicy,
    last_line: String,
}

impl IngestLoop {
    /// Create a loop using the wall clock
    pub fn new(source: SourceFile, store: Arc<dyn ReadingStore>, policy: SchedulePolicy) -> Self {
        Self::with_clock(source, store, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: SourceFile,
        store: Arc<dyn ReadingStore>,
        policy: SchedulePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            policy,
            last_line: String::new(),
        }
    }

    /// The most recently accepted raw line (empty until the first insert)
    pub fn last_line(&self) -> &str {
        &self.last_line
    }

    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    /// Run one poll cycle
    pub async fn poll_once(&mut self) -> Result<PollOutcome, IngestError> {
        let latest = self.source.last_line().await.map_err(|source| IngestError::Source {
            path: self.source.path().to_path_buf(),
            source,
        })?;

        let Some(latest) = latest else {
            return Ok(PollOutcome::Empty);
        };

        if latest == self.last_line {
            return Ok(PollOutcome::Unchanged);
        }

        let fields = match parse::parse_line(&latest) {
            Ok(Some(fields)) => fields,
            Ok(None) => {
                let fields = parse::field_count(&latest);
                debug!("Skipping line '{}' with {} fields", latest, fields);
                return Ok(PollOutcome::Malformed { fields });
            }
            Err((field, source)) => {
                return Err(IngestError::Parse { field, line: latest, source });
            }
        };

        let reading = Reading::new(fields.angle, fields.distance, self.clock.now());
        if let Err(cause) = self.store.insert(&reading).await {
            return Err(IngestError::Store { reading, cause });
        }

        info!("Inserted: {}", reading);
        self.last_line = latest;
        Ok(PollOutcome::Inserted(reading))
    }

    /// Poll once, log the outcome, and return how long to wait before the next poll
    pub async fn step(&mut self) -> Duration {
        let result = self.poll_once().await;
        match &result {
            Ok(PollOutcome::Inserted(_)) => {}
            Ok(outcome) => debug!("Poll: {}", outcome),
            Err(e) => error!("Error: {}", e),
        }
        self.policy.delay_after(&result)
    }

    /// Run the loop until shutdown signal
    pub async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            "Monitoring {} for updates (poll: {:?}, retry: {:?}, store: {})",
            self.source.path().display(),
            self.policy.poll_interval,
            self.policy.error_delay,
            self.store.name()
        );

        // A dropped sender is not a shutdown request; the loop keeps polling
        let mut shutdown_open = true;

        loop {
            let delay = self.step().await;
            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    msg = shutdown_rx.recv(), if shutdown_open => match msg {
                        Ok(()) | Err(RecvError::Lagged(_)) => {
                            info!("Ingest loop shutting down");
                            return;
                        }
                        Err(RecvError::Closed) => {
                            warn!("Shutdown channel closed; polling continues");
                            shutdown_open = false;
                        }
                    },
                }
            }
        }
    }
}
