//! OpenAI-compatible completion backend.
//!
//! Works with OpenAI and any endpoint exposing the same
//! `/v1/chat/completions` and `/v1/embeddings` surface.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Embeddings (used by the retrieval adapter to vectorize queries)

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use groundcrew_core::backend::*;
use groundcrew_core::error::BackendError;
use groundcrew_core::message::{Message, Role};

/// An OpenAI-compatible completion backend.
pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    /// Create a new OpenAI-compatible backend.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI backend (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, 120)
    }

    /// Map a non-200 status to a classified error.
    fn classify_status(status: u16, body: String) -> BackendError {
        match status {
            429 => BackendError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => BackendError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => BackendError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }

    /// Map a transport error, distinguishing timeouts from other
    /// network failures.
    fn classify_transport(e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(e.to_string())
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl groundcrew_core::CompletionBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(backend = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(Self::classify_transport)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(Self::classify_status(status, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| BackendError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| BackendError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        let message = Message {
            role: Role::Assistant,
            content: choice.message.content.unwrap_or_default(),
        };

        let usage = api_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(BackendResponse {
            id: api_response.id,
            model: api_response.model,
            message,
            finish_reason: choice.finish_reason,
            usage,
        })
    }

    async fn stream(
        &self,
        request: BackendRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, BackendError>>, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "stream": true,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(backend = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(Self::classify_transport)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend streaming error");
            return Err(Self::classify_status(status, error_body));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let backend_name = self.name.clone();

        // Spawn task to read the SSE byte stream and parse chunks.
        // Dropping the receiver makes the next send fail, which drops the
        // byte stream and aborts the in-flight HTTP request.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(BackendError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                // Append new bytes to our line buffer
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    // Skip empty lines and SSE comments
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    // Handle "data: ..." lines
                    if let Some(data) = line.strip_prefix("data: ") {
                        let data = data.trim();

                        // "[DONE]" signals end of stream
                        if data == "[DONE]" {
                            let _ = tx
                                .send(Ok(StreamChunk {
                                    content: None,
                                    done: true,
                                }))
                                .await;
                            return;
                        }

                        match serde_json::from_str::<StreamResponse>(data) {
                            Ok(stream_resp) => {
                                if let Some(choice) = stream_resp.choices.first() {
                                    let has_content = choice
                                        .delta
                                        .content
                                        .as_ref()
                                        .is_some_and(|c| !c.is_empty());

                                    if has_content {
                                        let chunk = StreamChunk {
                                            content: choice.delta.content.clone(),
                                            done: false,
                                        };
                                        if tx.send(Ok(chunk)).await.is_err() {
                                            return; // receiver dropped
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                trace!(
                                    backend = %backend_name,
                                    data = %data,
                                    error = %e,
                                    "Ignoring unparseable SSE chunk"
                                );
                            }
                        }
                    }
                }
            }

            // Stream ended without [DONE] — send final chunk
            let _ = tx
                .send(Ok(StreamChunk {
                    content: None,
                    done: true,
                }))
                .await;
        });

        Ok(rx)
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, BackendError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            backend = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(Self::classify_transport)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, error_body));
        }

        let api_resp: EmbeddingApiResponse =
            response.json().await.map_err(|e| BackendError::ApiError {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        let embeddings = api_resp.data.into_iter().map(|d| d.embedding).collect();

        Ok(EmbeddingResponse {
            embeddings,
            model: api_resp.model,
        })
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    id: String,
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}
