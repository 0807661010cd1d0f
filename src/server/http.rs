//! HTTP handlers for the reading query API

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::server::ServerState;
use crate::types::Reading;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
    pub server: String,
    pub version: String,
}

/// Paging query for `/api/radar/all`. Values are kept as strings so that
/// unparseable input falls back to the defaults instead of a 400.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    /// Resolve `(page, limit)`; missing, invalid, or non-positive values use the defaults
    pub fn resolve(&self, default_limit: usize) -> (usize, usize) {
        let positive = |v: &Option<String>| {
            v.as_deref()
                .and_then(|s| s.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
        };
        (
            positive(&self.page).unwrap_or(1),
            positive(&self.limit).unwrap_or(default_limit.max(1)),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub current: usize,
    pub pages: u64,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub data: Vec<Reading>,
    pub pagination: Pagination,
}

fn not_found() -> axum::response::Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "No radar data found" }))).into_response()
}

fn server_error(e: anyhow::Error) -> axum::response::Response {
    error!("Store query failed: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "Server error" }))).into_response()
}

/// Health check handler
pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let database = match state.store.ping().await {
        Ok(()) => "Connected",
        Err(e) => {
            debug!("Health ping failed: {:#}", e);
            "Disconnected"
        }
    };

    let response = HealthResponse {
        status: "OK".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database: database.to_string(),
        server: "Radar Ingest Query Server".to_string(),
        version: crate::VERSION.to_string(),
    };

    (StatusCode::OK, Json(response))
}

/// Newest reading
pub async fn latest_handler(State(state): State<ServerState>) -> impl IntoResponse {
    match state.store.latest().await {
        Ok(Some(reading)) => {
            debug!("Latest reading: {}", reading);
            (StatusCode::OK, Json(reading)).into_response()
        }
        Ok(None) => not_found(),
        Err(e) => server_error(e),
    }
}

/// All readings, newest first, paginated
pub async fn all_handler(
    State(state): State<ServerState>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    let (page, limit) = query.resolve(state.config.page_limit);
    let skip = (page - 1).saturating_mul(limit);

    let data = match state.store.page(skip, limit).await {
        Ok(data) => data,
        Err(e) => return server_error(e),
    };
    let total = match state.store.count().await {
        Ok(total) => total,
        Err(e) => return server_error(e),
    };

    let response = PageResponse {
        data,
        pagination: Pagination {
            current: page,
            pages: total.div_ceil(limit as u64),
            total,
        },
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// The most recent readings in chronological order
pub async fn recent_handler(State(state): State<ServerState>) -> impl IntoResponse {
    match state.store.recent(state.config.recent_limit).await {
        Ok(readings) if readings.is_empty() => not_found(),
        Ok(readings) => {
            debug!("Found {} recent readings", readings.len());
            (StatusCode::OK, Json(readings)).into_response()
        }
        Err(e) => server_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::server::router;
    use crate::store::{MockReadingStore, ReadingStore, SqliteStore};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(store: Arc<dyn ReadingStore>) -> ServerState {
        ServerState {
            store,
            config: Arc::new(ServerConfig::default()),
        }
    }

    async fn seeded(n: usize) -> Arc<dyn ReadingStore> {
        let store = SqliteStore::in_memory().unwrap();
        for i in 0..n {
            store.insert(&Reading::new(i as f64, 100.0, 1000.0 + i as f64)).await.unwrap();
        }
        Arc::new(store)
    }

    async fn get(store: Arc<dyn ReadingStore>, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router(state(store))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_page_query_defaults() {
        let query = PageQuery::default();
        assert_eq!(query.resolve(10), (1, 10));

        let query = PageQuery { page: Some("3".into()), limit: Some("25".into()) };
        assert_eq!(query.resolve(10), (3, 25));

        let query = PageQuery { page: Some("0".into()), limit: Some("abc".into()) };
        assert_eq!(query.resolve(10), (1, 10));

        let query = PageQuery { page: Some("-2".into()), limit: None };
        assert_eq!(query.resolve(10), (1, 10));
    }

    #[tokio::test]
    async fn test_latest() {
        let (status, body) = get(seeded(3).await, "/api/radar/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["angle"], 2.0);
        assert_eq!(body["timestamp"], 1002.0);
    }

    #[tokio::test]
    async fn test_latest_empty_is_404() {
        let (status, body) = get(seeded(0).await, "/api/radar/latest").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No radar data found");
    }

    #[tokio::test]
    async fn test_all_paginates() {
        let (status, body) = get(seeded(23).await, "/api/radar/all?page=3&limit=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"][0]["angle"], 2.0);
        assert_eq!(body["pagination"]["current"], 3);
        assert_eq!(body["pagination"]["pages"], 3);
        assert_eq!(body["pagination"]["total"], 23);
    }

    #[tokio::test]
    async fn test_all_huge_page_is_empty() {
        let uri = format!("/api/radar/all?page={}&limit=10", usize::MAX);
        let (status, body) = get(seeded(3).await, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
        assert_eq!(body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn test_recent_oldest_first() {
        let (status, body) = get(seeded(8).await, "/api/radar/recent").await;
        assert_eq!(status, StatusCode::OK);
        let angles: Vec<f64> = body.as_array().unwrap()
            .iter()
            .map(|r| r["angle"].as_f64().unwrap())
            .collect();
        assert_eq!(angles, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[tokio::test]
    async fn test_recent_empty_is_404() {
        let (status, _) = get(seeded(0).await, "/api/radar/recent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_disconnected_store() {
        let mut store = MockReadingStore::new();
        store.expect_ping().returning(|| Err(anyhow::anyhow!("unreachable")));

        let (status, body) = get(Arc::new(store), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["database"], "Disconnected");
    }

    #[tokio::test]
    async fn test_store_error_is_500() {
        let mut store = MockReadingStore::new();
        store.expect_latest().returning(|| Err(anyhow::anyhow!("boom")));

        let (status, body) = get(Arc::new(store), "/api/radar/latest").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server error");
    }
}
