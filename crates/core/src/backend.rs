//! CompletionBackend trait — the abstraction over the LLM service.
//!
//! A backend knows how to send a conversation to an LLM and get a
//! response back, either as a complete message or as a stream of delta
//! chunks. It also exposes the embeddings endpoint the retrieval adapter
//! uses to vectorize queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::message::Message;

/// Configuration for a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendRequest {
    /// The model to use (e.g., "gpt-4o", "gpt-3.5-turbo")
    pub model: String,

    /// The conversation messages, in order
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

fn default_temperature() -> f32 {
    0.7
}

/// A complete (non-streaming) response from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendResponse {
    /// Backend-assigned response id (e.g. "chatcmpl-...")
    pub id: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// The generated message
    pub message: Message,

    /// Why generation stopped, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Token usage statistics
    pub usage: Option<TokenUsage>,
}

/// Token usage information as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "text-embedding-ada-002").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,
}

/// The core CompletionBackend trait.
///
/// The orchestrator calls `complete()` or `stream()` without knowing which
/// backend is configured — pure polymorphism. Streaming hands back an mpsc
/// receiver: dropping it cancels the underlying HTTP stream, so caller
/// disconnection propagates all the way to the backend call.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: BackendRequest,
    ) -> std::result::Result<BackendResponse, BackendError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a
    /// single chunk followed by a done marker.
    async fn stream(
        &self,
        request: BackendRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, BackendError>>,
        BackendError,
    > {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let _ = tx
            .send(Ok(StreamChunk {
                content: Some(response.message.content),
                done: false,
            }))
            .await;
        let _ = tx
            .send(Ok(StreamChunk {
                content: None,
                done: true,
            }))
            .await;
        Ok(rx)
    }

    /// Generate embeddings for the given texts.
    ///
    /// Default implementation returns an error indicating embeddings
    /// aren't supported.
    async fn embed(
        &self,
        _request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, BackendError> {
        Err(BackendError::NotSupported(format!(
            "Backend '{}' does not support embeddings",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BlockingOnly;

    #[async_trait]
    impl CompletionBackend for BlockingOnly {
        fn name(&self) -> &str {
            "blocking_only"
        }

        async fn complete(
            &self,
            _request: BackendRequest,
        ) -> std::result::Result<BackendResponse, BackendError> {
            Ok(BackendResponse {
                id: "chatcmpl-test".into(),
                model: "test-model".into(),
                message: Message::assistant("hello"),
                finish_reason: Some("stop".into()),
                usage: Some(TokenUsage {
                    prompt_tokens: 3,
                    completion_tokens: 1,
                    total_tokens: 4,
                }),
            })
        }
    }

    fn request() -> BackendRequest {
        BackendRequest {
            model: "test-model".into(),
            messages: vec![Message::user("hi")],
            temperature: default_temperature(),
            max_tokens: None,
            stream: false,
        }
    }

    #[test]
    fn request_defaults() {
        let req = request();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(!req.stream);
    }

    #[test]
    fn request_deserializes_without_optionals() {
        let req: BackendRequest =
            serde_json::from_str(r#"{"model":"gpt-4o","messages":[]}"#).unwrap();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.max_tokens.is_none());
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let backend = BlockingOnly;
        let mut rx = backend.stream(request()).await.unwrap();

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.content.as_deref(), Some("hello"));
        assert!(!first.done);

        let last = rx.recv().await.unwrap().unwrap();
        assert!(last.done);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn default_embed_unsupported() {
        let backend = BlockingOnly;
        let result = backend
            .embed(EmbeddingRequest {
                model: "text-embedding-ada-002".into(),
                inputs: vec!["query".into()],
            })
            .await;
        assert!(matches!(result, Err(BackendError::NotSupported(_))));
    }
}
