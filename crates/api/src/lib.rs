//! AI Gateway API Server
//!
//! HTTP front end that resolves (task, model) pipelines through the
//! shared registry and dispatches inference requests to them.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod auth;
mod config;
mod error;
mod rate_limit;
mod routes;

pub use auth::{AllowAll, AuthPolicy};
pub use config::GatewayConfig;
pub use error::{ApiError, ErrorResponse};
pub use rate_limit::RateLimitConfig;

use pipeline::{BuiltinLoader, PipelineRegistry};

/// Application state shared across handlers
///
/// The registry synchronizes internally, so the state needs no outer
/// lock; handlers share it through an `Arc`.
pub struct AppState {
    /// Pipeline cache
    pub registry: PipelineRegistry,
    /// Authorization hook, accepts everything by default
    pub auth: Arc<dyn AuthPolicy>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create application state around a registry
    pub fn new(registry: PipelineRegistry) -> Self {
        Self {
            registry,
            auth: Arc::new(AllowAll),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Replace the authorization hook
    pub fn with_auth(mut self, auth: Arc<dyn AuthPolicy>) -> Self {
        self.auth = auth;
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub pipelines_loaded: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/ai-gateway", post(routes::gateway::dispatch))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        pipelines_loaded: state.registry.len(),
    })
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server
pub async fn run_server(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = PipelineRegistry::new(Arc::new(BuiltinLoader::new()));
    let state = Arc::new(AppState::new(registry));

    let governor = rate_limit::create_governor_config(&config.rate_limit);
    let app = create_router(state).layer(GovernorLayer { config: governor });

    info!("Starting AI gateway on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(PipelineRegistry::new(Arc::new(
            BuiltinLoader::new(),
        ))))
    }

    #[tokio::test]
    async fn test_health_reports_ok_with_no_side_effects() {
        let state = test_state();
        let Json(first) = health_handler(State(state.clone())).await;
        let Json(second) = health_handler(State(state.clone())).await;
        assert_eq!(first.status, "ok");
        assert_eq!(second.status, "ok");
        assert_eq!(first.pipelines_loaded, 0);
        assert!(state.registry.is_empty());
    }

    #[test]
    fn test_router_builds() {
        let _ = create_router(test_state());
    }
}
