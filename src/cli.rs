//! CLI interface for radar-ingest

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::{self, Config};
use crate::ingest::{IngestLoop, SchedulePolicy, SourceFile};

#[derive(Parser)]
#[command(name = "radar-ingest")]
#[command(about = "Tail a radar readout file into a document store and serve the readings", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// MongoDB connection string
    #[arg(long, env = "RADAR_STORE_URI", hide_env_values = true, global = true)]
    store_uri: Option<String>,

    /// Document store API key
    #[arg(long, env = "RADAR_STORE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the readout file and insert new readings
    Ingest {
        /// Readout file (overrides source.path)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Start the query API server
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,
    },
    /// Inspect or reset the configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Print the config file path
        #[arg(long)]
        path: bool,
        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_path()?,
    };

    match cli.command {
        Commands::Ingest { file, once } => {
            let mut config = Config::load_from(&config_path)?
                .with_store_uri(cli.store_uri)
                .with_api_key(cli.api_key);
            if let Some(file) = file {
                config.source.path = file;
            }
            run_ingest(config, once).await?;
        }
        Commands::Serve { port, host } => {
            let mut config = Config::load_from(&config_path)?
                .with_store_uri(cli.store_uri)
                .with_api_key(cli.api_key);
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            let store = crate::store::open(&config.store).await?;
            crate::server::start(store, config.server).await?;
        }
        Commands::Config { show, path, reset } => {
            if reset {
                config::reset_config(&config_path)?;
            } else if path {
                println!("{}", config_path.display());
            } else if show {
                let config = Config::load_from(&config_path)?;
                config::show_config(&config, &config_path);
            } else {
                println!("Configuration options:");
                println!("  --show    Display current configuration");
                println!("  --path    Print the config file path");
                println!("  --reset   Reset configuration to defaults");
                println!();
                println!("Default configuration:");
                println!("{}", config::default_config_toml());
            }
        }
    }

    Ok(())
}

async fn run_ingest(config: Config, once: bool) -> Result<()> {
    let store = crate::store::open(&config.store).await
        .context("Failed to open reading store")?;
    let policy = SchedulePolicy::from(config.schedule.clone());
    let mut ingest = IngestLoop::new(SourceFile::new(&config.source.path), store, policy);

    if once {
        let outcome = ingest.poll_once().await?;
        println!("{}", outcome);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received");
                let _ = shutdown_tx.send(());
            }
            Err(e) => warn!("Cannot listen for Ctrl-C, running until killed: {}", e),
        }
    });

    ingest.run(shutdown_rx).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;
    use crate::store::{ReadingStore, SqliteStore};
    use tempfile::TempDir;

    fn sqlite_config(dir: &TempDir, contents: &str) -> Config {
        let source = dir.path().join("radar_data.txt");
        std::fs::write(&source, contents).unwrap();

        let mut config = Config::default();
        config.source.path = source;
        config.store.backend = StoreBackend::Sqlite;
        config.store.sqlite_path = Some(dir.path().join("radar.db"));
        config
    }

    #[tokio::test]
    async fn test_ingest_once_inserts_last_line() {
        let dir = TempDir::new().unwrap();
        let config = sqlite_config(&dir, "5.0,300.0\n10.0,200.0\n");

        run_ingest(config, true).await.unwrap();

        let store = SqliteStore::new(dir.path().join("radar.db")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!((latest.angle, latest.distance), (10.0, 200.0));
    }

    #[tokio::test]
    async fn test_ingest_once_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let config = sqlite_config(&dir, "abc,1\n");

        let err = run_ingest(config, true).await.unwrap_err();
        assert!(err.to_string().contains("abc,1"), "{err}");

        let store = SqliteStore::new(dir.path().join("radar.db")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_once_missing_store_config_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = sqlite_config(&dir, "1.0,2.0\n");
        config.store.backend = StoreBackend::Document;

        assert!(run_ingest(config, true).await.is_err());
    }
}
