//! Query API server over the reading store

pub mod http;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::store::ReadingStore;

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<dyn ReadingStore>,
    pub config: Arc<ServerConfig>,
}

/// Build the API router
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(http::health_handler))
        .route("/api/radar/latest", get(http::latest_handler))
        .route("/api/radar/all", get(http::all_handler))
        .route("/api/radar/recent", get(http::recent_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the query server
pub async fn start(store: Arc<dyn ReadingStore>, config: ServerConfig) -> Result<()> {
    let listener = bind(&config).await?;
    let addr = listener.local_addr()?;
    let state = ServerState {
        store,
        config: Arc::new(config),
    };
    let app = router(state);

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("     Radar Query Server Starting");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("✓ Health check:  http://{}/api/health", addr);
    println!("✓ Latest:        http://{}/api/radar/latest", addr);
    println!("✓ Recent:        http://{}/api/radar/recent", addr);
    println!("✓ All (paged):   http://{}/api/radar/all?page=1&limit=10", addr);
    println!();

    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Bind the configured host, which may be a hostname or an IP literal
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))
}
