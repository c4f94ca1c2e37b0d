//! HTTP gateway for Haru.
//!
//! Serves the chat API, a health check and the embedded chat page.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;
pub mod frontend;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use haru_agent::ChatOrchestrator;
use haru_config::AppConfig;

pub use api::{ApiState, SharedState};

/// Request bodies above this size are rejected with 413.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the full router.
///
/// Layers applied:
/// - CORS for the configured origins
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(api::health_handler))
        .route("/api/chat", post(api::chat_handler))
        .route("/api/chat/stream", post(api::chat_stream_handler))
        .route("/api/tools", get(api::tools_handler))
        .with_state(state)
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Fails fast when no language-model credential is configured. A missing
/// weather key only degrades the weather tool.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.require_llm_key()?;
    if !config.has_weather_key() {
        warn!("OPENWEATHER_API_KEY not set; weather answers will be limited");
    }

    let provider = haru_providers::build_from_config(&config)?;
    let orchestrator = ChatOrchestrator::from_config(&config, provider);
    let state = Arc::new(ApiState { orchestrator });
    let app = build_router(state, &config.gateway.cors_origins);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    info!(
        addr = %addr,
        model = %config.llm.model,
        max_rounds = config.agent.max_rounds,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
