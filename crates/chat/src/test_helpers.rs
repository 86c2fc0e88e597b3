//! Shared test helpers for orchestrator tests.

use async_trait::async_trait;
use std::sync::Mutex;

use groundcrew_core::backend::{
    BackendRequest, BackendResponse, CompletionBackend, StreamChunk, TokenUsage,
};
use groundcrew_core::error::{BackendError, RetrievalError, UsageError};
use groundcrew_core::message::Message;
use groundcrew_core::retrieval::{RetrievalIndex, RetrievalResult, SearchFilter, TenantId};
use groundcrew_core::usage::{UsageRecord, UsageSink};

/// A mock backend that returns a sequence of scripted responses and
/// records every request it receives, so tests can assert on the
/// effective conversation that reached the backend.
///
/// Panics if more calls are made than responses provided.
pub struct SequentialMockBackend {
    responses: Mutex<Vec<BackendResponse>>,
    requests: Mutex<Vec<BackendRequest>>,
    call_count: Mutex<usize>,
}

impl SequentialMockBackend {
    pub fn new(responses: Vec<BackendResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            call_count: Mutex::new(0),
        }
    }

    /// Create a backend that returns a single text response.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// The requests received so far, in order.
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl CompletionBackend for SequentialMockBackend {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        self.requests.lock().unwrap().push(request);

        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockBackend: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let response = responses[*count].clone();
        *count += 1;
        Ok(response)
    }
}

/// A backend whose `complete` always fails with the given error.
pub struct FailingBackend(pub BackendError);

#[async_trait]
impl CompletionBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing_backend"
    }

    async fn complete(&self, _request: BackendRequest) -> Result<BackendResponse, BackendError> {
        Err(self.0.clone())
    }
}

/// A backend that streams a scripted chunk sequence, then closes the
/// channel.
pub struct ScriptedStreamBackend {
    script: Mutex<Option<Vec<Result<StreamChunk, BackendError>>>>,
}

impl ScriptedStreamBackend {
    pub fn new(script: Vec<Result<StreamChunk, BackendError>>) -> Self {
        Self {
            script: Mutex::new(Some(script)),
        }
    }
}

#[async_trait]
impl CompletionBackend for ScriptedStreamBackend {
    fn name(&self) -> &str {
        "scripted_stream"
    }

    async fn complete(&self, _request: BackendRequest) -> Result<BackendResponse, BackendError> {
        Err(BackendError::NotSupported(
            "scripted backend only streams".into(),
        ))
    }

    async fn stream(
        &self,
        _request: BackendRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, BackendError>>, BackendError> {
        let script = self
            .script
            .lock()
            .unwrap()
            .take()
            .expect("ScriptedStreamBackend: stream called twice");

        let (tx, rx) = tokio::sync::mpsc::channel(16);
        tokio::spawn(async move {
            for item in script {
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

/// An index that serves a fixed result set and counts queries.
pub struct StaticIndex {
    results: Vec<RetrievalResult>,
    searches: Mutex<Vec<(TenantId, String)>>,
}

impl StaticIndex {
    pub fn with_results(results: Vec<RetrievalResult>) -> Self {
        Self {
            results,
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_results(Vec::new())
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }

    /// The (tenant, query) pairs this index has been asked for.
    pub fn searches(&self) -> Vec<(TenantId, String)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetrievalIndex for StaticIndex {
    async fn search(
        &self,
        tenant: TenantId,
        query: &str,
        _filter: Option<&SearchFilter>,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        self.searches
            .lock()
            .unwrap()
            .push((tenant, query.to_string()));
        Ok(self.results.iter().take(limit).cloned().collect())
    }
}

/// An index whose every query fails.
pub struct FailingIndex;

#[async_trait]
impl RetrievalIndex for FailingIndex {
    async fn search(
        &self,
        _tenant: TenantId,
        _query: &str,
        _filter: Option<&SearchFilter>,
        _limit: usize,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        Err(RetrievalError::Store("index unreachable".into()))
    }
}

/// A sink that stores every delivered record.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<UsageRecord>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageSink for RecordingSink {
    async fn record(&self, record: UsageRecord) -> Result<(), UsageError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

/// A sink whose every delivery fails.
pub struct FailingSink;

#[async_trait]
impl UsageSink for FailingSink {
    async fn record(&self, _record: UsageRecord) -> Result<(), UsageError> {
        Err(UsageError::Delivery("sink offline".into()))
    }
}

/// Wait until the sink has received `n` records. Usage dispatch is
/// detached from the request path, so tests poll for it.
pub async fn wait_for_records(sink: &RecordingSink, n: usize) -> Vec<UsageRecord> {
    for _ in 0..100 {
        let records = sink.records();
        if records.len() >= n {
            return records;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("usage records never arrived (have {})", sink.records().len());
}

/// Create a retrieval result with the given title, content, and score.
pub fn make_result(title: &str, content: &str, score: f32) -> RetrievalResult {
    RetrievalResult {
        chunk_id: format!("chunk-{title}"),
        document_id: format!("doc-{title}"),
        document_title: title.to_string(),
        content: content.to_string(),
        score,
        metadata: serde_json::Map::new(),
    }
}

/// Create a simple text response with fixed usage numbers.
pub fn make_text_response(text: &str) -> BackendResponse {
    BackendResponse {
        id: "chatcmpl-mock".into(),
        model: "mock-model".into(),
        message: Message::assistant(text),
        finish_reason: Some("stop".into()),
        usage: Some(TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

/// A non-terminal content chunk.
pub fn delta(content: &str) -> Result<StreamChunk, BackendError> {
    Ok(StreamChunk {
        content: Some(content.to_string()),
        done: false,
    })
}

/// The backend's end-of-stream marker.
pub fn done_chunk() -> Result<StreamChunk, BackendError> {
    Ok(StreamChunk {
        content: None,
        done: true,
    })
}
