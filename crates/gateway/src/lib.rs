//! HTTP API gateway for Groundcrew.
//!
//! Exposes the chat completion endpoints over the wire shapes the
//! orchestrator is specified against:
//!
//! - `POST /v1/chat/completions`   — blocking completion
//! - `POST /v1/chat/stream`        — event-stream completion
//! - `POST /v1/chat/with-context`  — retrieval-augmented completion
//! - `GET  /health`                — liveness
//!
//! Caller identity is read from `x-user-id` / `x-org-id` headers at this
//! thin boundary; requests without them run unscoped (no retrieval, no
//! usage attribution).
//!
//! Built on Axum for high performance async HTTP.

pub mod routes;

use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use groundcrew_accounting::{HttpUsageSink, NoopUsageSink};
use groundcrew_backend::OpenAiCompatBackend;
use groundcrew_chat::ChatService;
use groundcrew_config::AppConfig;
use groundcrew_core::{CompletionBackend, RetrievalIndex, UsageSink};
use groundcrew_retrieval::{ChromaIndex, NoopIndex};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub chat: ChatService,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState, config: &AppConfig) -> axum::Router {
    // CORS: explicit origins from config; invalid entries are skipped.
    let origins: Vec<axum::http::HeaderValue> = config
        .gateway
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION]);

    routes::router(state)
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire the service graph from configuration: backend client, retrieval
/// index, usage sink, orchestrator.
pub fn build_state(config: &AppConfig) -> SharedState {
    let api_key = config.api_key.clone().unwrap_or_default();

    let backend: Arc<dyn CompletionBackend> = Arc::new(OpenAiCompatBackend::new(
        "openai",
        config.backend.base_url.clone(),
        api_key,
        config.backend.timeout_secs,
    ));

    let index: Arc<dyn RetrievalIndex> = if config.retrieval.enabled {
        Arc::new(ChromaIndex::new(
            config.retrieval.index_url.clone(),
            backend.clone(),
            config.backend.embedding_model.clone(),
            config.retrieval.timeout_secs,
        ))
    } else {
        info!("Retrieval disabled, context-augmented requests degrade to direct completions");
        Arc::new(NoopIndex)
    };

    let usage_sink: Arc<dyn UsageSink> = if config.usage.enabled {
        Arc::new(HttpUsageSink::new(
            config.usage.base_url.clone(),
            config.usage.service_token.clone(),
            config.usage.timeout_secs,
        ))
    } else {
        info!("Usage accounting disabled");
        Arc::new(NoopUsageSink)
    };

    let chat = ChatService::new(backend, index, usage_sink, config.completion.clone());

    Arc::new(GatewayState { chat })
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = build_state(&config);
    let app = build_router(state, &config);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
