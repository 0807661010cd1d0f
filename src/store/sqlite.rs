//! SQLite-based reading store

use anyhow::{Context, Result};
use rusqlite::{Connection, params, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::ReadingStore;
use crate::types::Reading;

/// SQLite-based reading store
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create a new SQLite store at the given path
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory store
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                angle REAL NOT NULL,
                distance REAL NOT NULL,
                timestamp REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_readings_timestamp ON readings(timestamp DESC);
        "#)?;

        Ok(())
    }

    fn row_to_reading(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reading> {
        Ok(Reading {
            angle: row.get(0)?,
            distance: row.get(1)?,
            timestamp: row.get(2)?,
        })
    }
}

#[async_trait::async_trait]
impl ReadingStore for SqliteStore {
    async fn insert(&self, reading: &Reading) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO readings (angle, distance, timestamp) VALUES (?1, ?2, ?3)",
            params![reading.angle, reading.distance, reading.timestamp],
        )?;
        Ok(())
    }

    async fn latest(&self) -> Result<Option<Reading>> {
        let conn = self.conn.lock().await;
        let reading = conn
            .query_row(
                "SELECT angle, distance, timestamp FROM readings
                 ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                Self::row_to_reading,
            )
            .optional()?;
        Ok(reading)
    }

    async fn page(&self, skip: usize, limit: usize) -> Result<Vec<Reading>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT angle, distance, timestamp FROM readings
             ORDER BY timestamp DESC, id DESC LIMIT ?1 OFFSET ?2",
        )?;
        // SQLite treats a negative LIMIT or OFFSET as unbounded
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);
        let readings = stmt
            .query_map(params![limit, skip], Self::row_to_reading)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(readings)
    }

    async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_insert_and_latest() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("test.db")).await.unwrap();

        assert!(store.latest().await.unwrap().is_none());

        store.insert(&Reading::new(10.0, 200.0, 100.0)).await.unwrap();
        store.insert(&Reading::new(20.0, 150.0, 101.0)).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest, Reading::new(20.0, 150.0, 101.0));
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_page_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        for i in 0..7 {
            store.insert(&Reading::new(i as f64, 10.0, 100.0 + i as f64)).await.unwrap();
        }

        let first = store.page(0, 3).await.unwrap();
        let angles: Vec<f64> = first.iter().map(|r| r.angle).collect();
        assert_eq!(angles, vec![6.0, 5.0, 4.0]);

        let last = store.page(6, 3).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].angle, 0.0);
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let store = SqliteStore::in_memory().unwrap();
        for i in 0..3 {
            store.insert(&Reading::new(i as f64, 10.0, 100.0 + i as f64)).await.unwrap();
        }

        assert!(store.page(usize::MAX, 10).await.unwrap().is_empty());
        assert!(store.page(3, usize::MAX).await.unwrap().is_empty());
        assert_eq!(store.page(0, usize::MAX).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_recent_is_chronological() {
        let store = SqliteStore::in_memory().unwrap();
        for i in 0..7 {
            store.insert(&Reading::new(i as f64, 10.0, 100.0 + i as f64)).await.unwrap();
        }

        let recent = store.recent(5).await.unwrap();
        let angles: Vec<f64> = recent.iter().map(|r| r.angle).collect();
        assert_eq!(angles, vec![2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[tokio::test]
    async fn test_duplicate_readings_are_kept() {
        let store = SqliteStore::in_memory().unwrap();
        let reading = Reading::new(1.0, 2.0, 3.0);
        store.insert(&reading).await.unwrap();
        store.insert(&reading).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        store.ping().await.unwrap();
    }
}
