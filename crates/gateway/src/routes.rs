//! Chat completion routes and wire DTOs.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use groundcrew_chat::stream::EVENT_STREAM_CONTENT_TYPE;
use groundcrew_chat::{ChatRequest, CompletionResult};
use groundcrew_core::error::Error;
use groundcrew_core::message::Message;
use groundcrew_core::retrieval::SearchFilter;
use groundcrew_core::usage::RequestScope;

use crate::SharedState;

/// Build the route table. The caller layers CORS and tracing on top.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/chat/completions", post(chat_completion_handler))
        .route("/v1/chat/stream", post(chat_stream_handler))
        .route("/v1/chat/with-context", post(chat_with_context_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatCompletionRequest {
    /// The conversation, in order.
    messages: Vec<Message>,

    #[serde(default)]
    model: Option<String>,

    #[serde(default)]
    temperature: Option<f32>,

    #[serde(default)]
    max_tokens: Option<u32>,

    /// Restrict retrieval to a document category (with-context only).
    #[serde(default)]
    category: Option<String>,

    /// Accepted for wire compatibility; streaming has its own route.
    #[serde(default)]
    #[allow(dead_code)]
    stream: bool,
}

impl ChatCompletionRequest {
    fn into_chat_request(self) -> ChatRequest {
        ChatRequest {
            messages: self.messages,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            filter: self.category.map(SearchFilter::category),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionResponse {
    id: String,
    object: &'static str,
    created: i64,
    model: String,
    choices: Vec<ChoiceDto>,
    usage: UsageDto,
}

#[derive(Serialize)]
struct ChoiceDto {
    index: u32,
    message: Message,
    finish_reason: Option<String>,
}

#[derive(Serialize)]
struct UsageDto {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
    estimated_cost: f64,
}

impl ChatCompletionResponse {
    fn from_result(result: CompletionResult) -> Self {
        Self {
            id: result.id,
            object: "chat.completion",
            created: chrono::Utc::now().timestamp(),
            model: result.model,
            choices: vec![ChoiceDto {
                index: 0,
                message: result.message,
                finish_reason: result.finish_reason,
            }],
            usage: UsageDto {
                prompt_tokens: result.usage.prompt_tokens,
                completion_tokens: result.usage.completion_tokens,
                total_tokens: result.usage.total_tokens,
                estimated_cost: result.usage.estimated_cost,
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ── Helpers ───────────────────────────────────────────────────────────────

/// Read the caller identity from `x-user-id` / `x-org-id` headers.
/// Both must be present and numeric for the request to run scoped.
fn scope_from_headers(headers: &HeaderMap) -> Option<RequestScope> {
    let parse = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
    };
    Some(RequestScope::new(parse("x-user-id")?, parse("x-org-id")?))
}

fn into_error_response(e: Error) -> (StatusCode, Json<ErrorResponse>) {
    warn!(error = %e, "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /v1/chat/completions` — blocking completion.
async fn chat_completion_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatCompletionRequest>,
) -> Result<Json<ChatCompletionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let scope = scope_from_headers(&headers);
    info!(scoped = scope.is_some(), "v1/chat/completions request");

    let result = state
        .chat
        .complete(payload.into_chat_request(), scope)
        .await
        .map_err(into_error_response)?;

    Ok(Json(ChatCompletionResponse::from_result(result)))
}

/// `POST /v1/chat/with-context` — retrieval-augmented completion.
async fn chat_with_context_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatCompletionRequest>,
) -> Result<Json<ChatCompletionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let scope = scope_from_headers(&headers);
    info!(scoped = scope.is_some(), "v1/chat/with-context request");

    let result = state
        .chat
        .complete_with_context(payload.into_chat_request(), scope)
        .await
        .map_err(into_error_response)?;

    Ok(Json(ChatCompletionResponse::from_result(result)))
}

/// `POST /v1/chat/stream` — completion as an event stream.
///
/// The body is built frame-by-frame from the orchestrator's events so the
/// terminal `data: [DONE]\n\n` sentinel is byte-exact on the wire. When
/// the client disconnects, the body stream is dropped, which drops the
/// event receiver and aborts the in-flight generation.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatCompletionRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let scope = scope_from_headers(&headers);
    info!(scoped = scope.is_some(), "v1/chat/stream request");

    let rx = state
        .chat
        .stream(payload.into_chat_request(), scope)
        .await
        .map_err(into_error_response)?;

    let frames =
        ReceiverStream::new(rx).map(|event| Ok::<String, Infallible>(event.to_sse_frame()));

    Ok((
        [
            (header::CONTENT_TYPE, EVENT_STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(frames),
    ))
}
