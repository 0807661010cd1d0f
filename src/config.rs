//! Configuration management
//!
//! Manages ingest configuration: the source file, poll scheduling, the
//! reading store backend, and the query server.

use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sensor readout file
    #[serde(default)]
    pub source: SourceConfig,
    /// Poll and retry delays
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Reading store backend
    #[serde(default)]
    pub store: StoreConfig,
    /// Query API server
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path of the text file the sensor appends `angle,distance` lines to
    #[serde(default = "default_source_path")]
    pub path: PathBuf,
}

fn default_source_path() -> PathBuf {
    PathBuf::from("radar_data.txt")
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Delay between poll cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Delay after a failed cycle
    #[serde(default = "default_error_delay")]
    pub error_delay_ms: u64,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_error_delay() -> u64 {
    2000
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            error_delay_ms: default_error_delay(),
        }
    }
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms)
    }
}

/// Which store readings are written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// MongoDB via a `mongodb://` or `mongodb+srv://` connection string
    Mongo,
    /// Remote document store over its HTTP data API
    Document,
    /// Local SQLite database
    Sqlite,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Mongo => write!(f, "mongo"),
            StoreBackend::Document => write!(f, "document"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// SQLite database file (defaults to `radar.db` in the data directory)
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
    #[serde(default)]
    pub document: DocumentStoreConfig,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Mongo
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sqlite_path: None,
            document: DocumentStoreConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Resolve the SQLite database path
    pub fn sqlite_path(&self) -> Result<PathBuf> {
        match &self.sqlite_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("radar.db")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    /// Connection string for the mongo backend (RADAR_STORE_URI overrides)
    #[serde(default)]
    pub uri: Option<String>,
    /// Base URL of the data API, e.g. `https://data.example.net/app/<id>/endpoint/data/v1`
    #[serde(default)]
    pub endpoint: String,
    /// API key sent in the `api-key` header (RADAR_STORE_API_KEY overrides)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Cluster / data source name
    #[serde(default = "default_data_source")]
    pub data_source: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_data_source() -> String {
    "Cluster0".to_string()
}

fn default_database() -> String {
    "radarDB".to_string()
}

fn default_collection() -> String {
    "scans".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            uri: None,
            endpoint: String::new(),
            api_key: None,
            data_source: default_data_source(),
            database: default_database(),
            collection: default_collection(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of readings returned by `/api/radar/recent`
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    /// Page size used by `/api/radar/all` when none is given
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_recent_limit() -> usize {
    5
}

fn default_page_limit() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            recent_limit: default_recent_limit(),
            page_limit: default_page_limit(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, creating it if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create config directory")?;
            }
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Apply the connection string from the environment, if set
    pub fn with_store_uri(mut self, uri: Option<String>) -> Self {
        if let Some(uri) = uri.filter(|u| !u.is_empty()) {
            self.store.document.uri = Some(uri);
        }
        self
    }

    /// Apply the API key from the environment, if set
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.store.document.api_key = Some(key);
        }
        self
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "radar-ingest", "radar-ingest")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "radar-ingest", "radar-ingest")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}

/// Show current configuration
pub fn show_config(config: &Config, path: &Path) {
    println!("Configuration: {}", path.display());
    println!();
    println!("  Source file:      {}", config.source.path.display());
    println!("  Poll interval:    {} ms", config.schedule.poll_interval_ms);
    println!("  Error delay:      {} ms", config.schedule.error_delay_ms);
    println!("  Store backend:    {}", config.store.backend);
    match config.store.backend {
        StoreBackend::Mongo => {
            let doc = &config.store.document;
            // The connection string usually embeds credentials
            println!("  Connection:       {}", doc.uri.as_ref().map(|_| "Configured").unwrap_or("Not configured"));
            println!("  Target:           {}.{}", doc.database, doc.collection);
        }
        StoreBackend::Document => {
            let doc = &config.store.document;
            println!("  Endpoint:         {}", if doc.endpoint.is_empty() { "(not set)" } else { doc.endpoint.as_str() });
            println!("  API key:          {}", doc.api_key.as_ref().map(|_| "Configured").unwrap_or("Not configured"));
            println!("  Target:           {}/{}.{}", doc.data_source, doc.database, doc.collection);
        }
        StoreBackend::Sqlite => match config.store.sqlite_path() {
            Ok(path) => println!("  Database file:    {}", path.display()),
            Err(e) => println!("  Database file:    unavailable ({})", e),
        },
    }
    println!("  Query server:     {}:{}", config.server.host, config.server.port);
}

/// Reset configuration to defaults
pub fn reset_config(path: &Path) -> Result<()> {
    Config::default().save_to(path)?;
    println!("Configuration reset to defaults.");
    Ok(())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.source.path, PathBuf::from("radar_data.txt"));
        assert_eq!(config.schedule.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.schedule.error_delay(), Duration::from_secs(2));
        assert_eq!(config.store.document.database, "radarDB");
        assert_eq!(config.store.document.collection, "scans");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.recent_limit, 5);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            "[store]\nbackend = \"sqlite\"\nsqlite_path = \"/tmp/r.db\"\n\n[schedule]\npoll_interval_ms = 250\n",
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.sqlite_path().unwrap(), PathBuf::from("/tmp/r.db"));
        assert_eq!(config.schedule.poll_interval_ms, 250);
        assert_eq!(config.schedule.error_delay_ms, 2000);
        assert_eq!(config.source.path, PathBuf::from("radar_data.txt"));
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.server.page_limit, 10);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.store.backend, StoreBackend::Mongo);
    }

    #[test]
    fn test_env_api_key_overrides() {
        let config = Config::default().with_api_key(Some("secret".to_string()));
        assert_eq!(config.store.document.api_key.as_deref(), Some("secret"));

        let config = Config::default().with_api_key(Some(String::new()));
        assert!(config.store.document.api_key.is_none());
    }

    #[test]
    fn test_mongo_uri_from_file_and_env() {
        let config: Config = toml::from_str(
            "[store]\nbackend = \"mongo\"\n\n[store.document]\nuri = \"mongodb+srv://u:p@cluster0.example.net\"\n",
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Mongo);
        assert_eq!(config.store.document.uri.as_deref(), Some("mongodb+srv://u:p@cluster0.example.net"));
        assert_eq!(config.store.document.database, "radarDB");
        assert_eq!(config.store.document.collection, "scans");

        let config = config.with_store_uri(Some("mongodb://localhost:27017".to_string()));
        assert_eq!(config.store.document.uri.as_deref(), Some("mongodb://localhost:27017"));

        let config = config.with_store_uri(None);
        assert_eq!(config.store.document.uri.as_deref(), Some("mongodb://localhost:27017"));
    }

    #[test]
    fn test_default_toml_round_trips() {
        let parsed: Config = toml::from_str(&default_config_toml()).unwrap();
        assert_eq!(parsed.server.host, "127.0.0.1");
    }
}
