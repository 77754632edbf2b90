//! Measurement Records API Server
//!
//! REST API over the record store: listing, single and bulk upserts, and
//! aggregate statistics.

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
mod routes;

pub use self::config::{LogConfig, ServerConfig, Settings};
pub use error::{ApiError, ErrorResponse};
pub use routes::data::{BulkResponse, SaveResponse};

use data_validator::Validator;
use storage::Repository;

/// Application state shared across handlers
pub struct AppState {
    /// Record store
    pub repository: Repository,
    /// Payload validator
    pub validator: Validator,
    /// Prometheus handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(repository: Repository, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            repository,
            validator: Validator::new(),
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub record_count: i64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let api = Router::new()
        .route(
            "/data/",
            get(routes::data::list_records).post(routes::data::save_record),
        )
        .route("/data/bulk/", post(routes::data::bulk_upsert))
        .route("/stats/", get(routes::stats::get_stats));

    let prefix = server.api_prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };

    router
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Health check handler
async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let record_count = state.repository.count().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        record_count,
    }))
}

/// Prometheus scrape handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown log level {:?}", config.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Run the server until interrupted
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let repository = Repository::connect(&settings.store).await?;

    let metrics = if settings.metrics.enabled {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let state = Arc::new(AppState::new(repository.clone(), metrics));
    let app = create_router(state, &settings.server);

    info!(
        "Starting API server on {} (prefix {:?})",
        settings.server.bind_addr, settings.server.api_prefix
    );

    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    repository.close().await;
    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn app(prefix: &str) -> Router {
        let repository = Repository::in_memory().await.unwrap();
        let state = Arc::new(AppState::new(repository, None));
        let server = ServerConfig {
            api_prefix: prefix.to_string(),
            ..Default::default()
        };
        create_router(state, &server)
    }

    async fn get_status(app: Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_routes_mounted_under_prefix() {
        assert_eq!(get_status(app("/api").await, "/api/data/").await, StatusCode::OK);
        assert_eq!(get_status(app("/api").await, "/data/").await, StatusCode::NOT_FOUND);
        assert_eq!(get_status(app("/v2/").await, "/v2/data/").await, StatusCode::OK);
        assert_eq!(get_status(app("").await, "/data/").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_reports_record_count() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app("/api").await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.record_count, 0);
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        assert_eq!(get_status(app("/api").await, "/metrics").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_body_uses_detail() {
        let request = Request::builder().uri("/api/stats/").body(Body::empty()).unwrap();
        let response = app("/api").await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.detail, "No data available");
    }

    async fn preflight(app: Router, origin: &str) -> Option<HeaderValue> {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/data/bulk/")
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        response
            .headers()
            .get("access-control-allow-origin")
            .cloned()
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origins_only() {
        let repository = Repository::in_memory().await.unwrap();
        let state = Arc::new(AppState::new(repository, None));
        let server = ServerConfig {
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "bad\norigin".to_string(),
            ],
            ..Default::default()
        };
        let app = create_router(state, &server);

        let allowed = preflight(app.clone(), "http://localhost:3000").await;
        assert_eq!(allowed.unwrap(), "http://localhost:3000");
        assert!(preflight(app, "http://evil.example").await.is_none());
    }

    #[tokio::test]
    async fn test_cors_permissive_without_origins() {
        let allowed = preflight(app("/api").await, "http://evil.example").await;
        assert_eq!(allowed.unwrap(), "*");
    }
}
