//! The completion orchestrator.
//!
//! `ChatService` drives the three entry points (direct, context-augmented,
//! streaming) over the injected collaborators: the completion backend,
//! the retrieval index, and the usage sink. All defaults come from the
//! `CompletionDefaults` the service was constructed with.
//!
//! Accounting always uses the model name the backend actually answered
//! with and hands the resulting `UsageRecord` to the sink from a detached
//! task — a sink failure can never fail or delay a response.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use groundcrew_accounting as accounting;
use groundcrew_config::CompletionDefaults;
use groundcrew_core::backend::{BackendRequest, CompletionBackend};
use groundcrew_core::error::Result;
use groundcrew_core::message::{Message, latest_user_content};
use groundcrew_core::retrieval::{RetrievalIndex, SearchFilter};
use groundcrew_core::usage::{RequestScope, UsageRecord, UsageSink};

use crate::context;
use crate::stream::StreamEvent;

/// A completion request as accepted by the orchestrator. Unset fields
/// fall back to the service's `CompletionDefaults`.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Metadata filter applied when this request retrieves context.
    pub filter: Option<SearchFilter>,
}

impl ChatRequest {
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

/// Terminal artifact of a blocking completion.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub id: String,
    pub model: String,
    pub message: Message,
    pub finish_reason: Option<String>,
    pub usage: UsageRecord,
}

/// The orchestrator. One instance serves many concurrent requests; all
/// per-request state lives on the request's own task.
pub struct ChatService {
    backend: Arc<dyn CompletionBackend>,
    index: Arc<dyn RetrievalIndex>,
    usage_sink: Arc<dyn UsageSink>,
    defaults: CompletionDefaults,
}

impl ChatService {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        index: Arc<dyn RetrievalIndex>,
        usage_sink: Arc<dyn UsageSink>,
        defaults: CompletionDefaults,
    ) -> Self {
        Self {
            backend,
            index,
            usage_sink,
            defaults,
        }
    }

    /// Apply the configured defaults to a request.
    fn effective_request(&self, request: &ChatRequest) -> BackendRequest {
        BackendRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.defaults.model.clone()),
            messages: request.messages.clone(),
            temperature: request.temperature.unwrap_or(self.defaults.temperature),
            max_tokens: Some(request.max_tokens.unwrap_or(self.defaults.max_tokens)),
            stream: false,
        }
    }

    /// Direct completion: no retrieval, blocking backend call, full
    /// accounting.
    pub async fn complete(
        &self,
        request: ChatRequest,
        scope: Option<RequestScope>,
    ) -> Result<CompletionResult> {
        let backend_request = self.effective_request(&request);
        info!(
            model = %backend_request.model,
            messages = backend_request.messages.len(),
            "Generating completion"
        );

        let response = self.backend.complete(backend_request.clone()).await?;

        let (prompt_tokens, completion_tokens) = match response.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => {
                // Backend omitted usage; count locally with the resolver.
                let tokenizer = accounting::resolve(&response.model);
                (
                    tokenizer.count_messages(&backend_request.messages) as u32,
                    tokenizer.count(&response.message.content) as u32,
                )
            }
        };

        let usage = build_usage_record(
            &response.model,
            prompt_tokens,
            completion_tokens,
            response.id.clone(),
            scope,
        );

        debug!(
            model = %response.model,
            prompt_tokens,
            completion_tokens,
            cost = usage.estimated_cost,
            "Token usage"
        );

        if scope.is_some() {
            self.dispatch_usage(usage.clone());
        }

        Ok(CompletionResult {
            id: response.id,
            model: response.model,
            message: response.message,
            finish_reason: response.finish_reason,
            usage,
        })
    }

    /// Context-augmented completion (RAG).
    ///
    /// Retrieves tenant knowledge for the latest user message and injects
    /// it as grounding context before delegating to [`Self::complete`].
    /// Degrades silently to a direct completion when the conversation has
    /// no user message, no tenant scope is available, or retrieval finds
    /// nothing. A retrieval failure propagates as its own error, distinct
    /// from "no results".
    pub async fn complete_with_context(
        &self,
        request: ChatRequest,
        scope: Option<RequestScope>,
    ) -> Result<CompletionResult> {
        let Some(query) = latest_user_content(&request.messages).map(str::to_string) else {
            debug!("Conversation has no user message, using direct completion");
            return self.complete(request, scope).await;
        };

        let Some(tenant_scope) = scope else {
            debug!("No tenant scope, using direct completion");
            return self.complete(request, scope).await;
        };

        let results = self
            .index
            .search(
                tenant_scope.tenant(),
                &query,
                request.filter.as_ref(),
                self.defaults.retrieval_limit,
            )
            .await?;

        if results.is_empty() {
            debug!(tenant = %tenant_scope.tenant(), "No relevant chunks, using direct completion");
            return self.complete(request, scope).await;
        }

        info!(
            tenant = %tenant_scope.tenant(),
            chunks = results.len(),
            "Injecting grounding context"
        );

        let grounding = context::assemble(&results);
        let mut request = request;
        request.messages = context::inject(std::mem::take(&mut request.messages), &grounding);

        self.complete(request, scope).await
    }

    /// Streaming completion.
    ///
    /// Prompt tokens are counted once up front from the full message list
    /// (the backend does not report usage incrementally); each delta is
    /// counted as it arrives. The returned channel yields one `Delta` per
    /// non-empty chunk and closes after exactly one terminal event.
    /// Dropping the receiver stops the forwarding task, which drops the
    /// backend stream and aborts the in-flight generation.
    pub async fn stream(
        &self,
        request: ChatRequest,
        scope: Option<RequestScope>,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        let mut backend_request = self.effective_request(&request);
        backend_request.stream = true;

        let model = backend_request.model.clone();
        let tokenizer = accounting::resolve(&model);
        let prompt_tokens = tokenizer.count_messages(&backend_request.messages) as u32;

        info!(model = %model, "Starting streaming completion");
        let mut backend_rx = self.backend.stream(backend_request).await?;

        let (tx, rx) = mpsc::channel(64);
        let sink = self.usage_sink.clone();

        tokio::spawn(async move {
            let mut completion_tokens: u32 = 0;

            loop {
                match backend_rx.recv().await {
                    Some(Ok(chunk)) => {
                        if chunk.done {
                            let _ = tx.send(StreamEvent::Done).await;
                            break;
                        }
                        if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                            completion_tokens += tokenizer.count(&content) as u32;
                            if tx.send(StreamEvent::Delta { content }).await.is_err() {
                                // Consumer disconnected; dropping backend_rx
                                // aborts the in-flight generation.
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Backend failed mid-stream");
                        let _ = tx
                            .send(StreamEvent::Error {
                                message: e.to_string(),
                            })
                            .await;
                        return;
                    }
                    None => {
                        let _ = tx.send(StreamEvent::Done).await;
                        break;
                    }
                }
            }

            // Normal exhaustion: account the stream.
            if scope.is_some() {
                let request_id = format!("chatcmpl-{}", Uuid::new_v4());
                let record = build_usage_record(
                    &model,
                    prompt_tokens,
                    completion_tokens,
                    request_id,
                    scope,
                );
                if let Err(e) = sink.record(record).await {
                    warn!(error = %e, "Usage record delivery failed");
                }
            }
        });

        Ok(rx)
    }

    /// Hand a usage record to the sink without waiting for it.
    fn dispatch_usage(&self, record: UsageRecord) {
        let sink = self.usage_sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record(record).await {
                warn!(error = %e, "Usage record delivery failed");
            }
        });
    }
}

/// Build the accounting record for one completion, pricing it with the
/// model that actually served the request.
fn build_usage_record(
    model: &str,
    prompt_tokens: u32,
    completion_tokens: u32,
    request_id: String,
    scope: Option<RequestScope>,
) -> UsageRecord {
    UsageRecord {
        user_id: scope.map(|s| s.user_id),
        org_id: scope.map(|s| s.org_id),
        model: model.to_string(),
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
        estimated_cost: accounting::estimate_cost(model, prompt_tokens, completion_tokens),
        request_id,
        metadata: serde_json::Map::new(),
    }
}
