//! Chroma-backed retrieval index.
//!
//! Each tenant owns one collection named `org_{tenant_id}`. The query
//! text is vectorized through the completion backend's embeddings
//! endpoint, then the collection is searched by embedding similarity.
//!
//! Score convention: Chroma reports **distances**, so results arrive in
//! ascending order and lower scores are more relevant. The adapter
//! preserves that order; consumers treat adapter order as ranked order.
//!
//! A tenant without a collection is not an error — the search returns an
//! empty result set. Transport failures, embedding failures, and query
//! rejections surface as `RetrievalError` so callers can tell "nothing
//! relevant" apart from "retrieval broke".

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use groundcrew_core::backend::{CompletionBackend, EmbeddingRequest};
use groundcrew_core::error::RetrievalError;
use groundcrew_core::retrieval::{RetrievalIndex, RetrievalResult, SearchFilter, TenantId};

/// Retrieval index over a Chroma HTTP API.
pub struct ChromaIndex {
    index_url: String,
    embedder: Arc<dyn CompletionBackend>,
    embedding_model: String,
    client: reqwest::Client,
}

impl ChromaIndex {
    /// Create an index adapter for the given store.
    pub fn new(
        index_url: impl Into<String>,
        embedder: Arc<dyn CompletionBackend>,
        embedding_model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            index_url: index_url.into().trim_end_matches('/').to_string(),
            embedder,
            embedding_model: embedding_model.into(),
            client,
        }
    }

    /// Look up a collection id by name. `Ok(None)` means the tenant has
    /// no collection yet.
    async fn collection_id(&self, name: &str) -> Result<Option<String>, RetrievalError> {
        let url = format!("{}/api/v1/collections/{}", self.index_url, name);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RetrievalError::Store(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let collection: ChromaCollection = response
                .json()
                .await
                .map_err(|e| RetrievalError::QueryFailed(e.to_string()))?;
            return Ok(Some(collection.id));
        }

        let body = response.text().await.unwrap_or_default();
        if collection_missing(status.as_u16(), &body) {
            debug!(collection = %name, "Collection does not exist, returning no results");
            return Ok(None);
        }

        Err(RetrievalError::QueryFailed(format!(
            "collection lookup returned {status}: {body}"
        )))
    }

    /// Embed the query text through the backend's embeddings endpoint.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .embedder
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![query.to_string()],
            })
            .await
            .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::EmbeddingFailed("backend returned no vectors".into()))
    }
}

#[async_trait]
impl RetrievalIndex for ChromaIndex {
    async fn search(
        &self,
        tenant: TenantId,
        query: &str,
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let collection_name = tenant.collection_name();

        let Some(collection_id) = self.collection_id(&collection_name).await? else {
            return Ok(Vec::new());
        };

        let embedding = self.embed_query(query).await?;

        let mut body = serde_json::json!({
            "query_embeddings": [embedding],
            "n_results": limit,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(where_clause) = filter.and_then(build_where_clause) {
            body["where"] = where_clause;
        }

        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.index_url, collection_id
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Store(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = %status, collection = %collection_name, "Index query failed");
            return Err(RetrievalError::QueryFailed(format!(
                "query returned {status}: {error_body}"
            )));
        }

        let query_response: ChromaQueryResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::QueryFailed(e.to_string()))?;

        let results = into_results(query_response);
        debug!(
            tenant = %tenant,
            results = results.len(),
            "Retrieval query complete"
        );
        Ok(results)
    }
}

/// Whether a failed collection lookup means "no such collection" rather
/// than a broken index.
fn collection_missing(status: u16, body: &str) -> bool {
    status == 404 || body.contains("does not exist")
}

/// Build a Chroma `where` clause from a metadata equality filter.
/// A single field maps directly; multiple fields combine under `$and`.
fn build_where_clause(filter: &SearchFilter) -> Option<serde_json::Value> {
    if filter.is_empty() {
        return None;
    }

    if filter.fields.len() == 1 {
        let (key, value) = filter.fields.iter().next()?;
        return Some(serde_json::json!({ key: value }));
    }

    let clauses: Vec<serde_json::Value> = filter
        .fields
        .iter()
        .map(|(key, value)| serde_json::json!({ key: value }))
        .collect();
    Some(serde_json::json!({ "$and": clauses }))
}

/// Flatten Chroma's parallel-array response into ranked results,
/// preserving the store's ascending-distance order.
fn into_results(response: ChromaQueryResponse) -> Vec<RetrievalResult> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let documents = response.documents.into_iter().next().unwrap_or_default();
    let metadatas = response.metadatas.into_iter().next().unwrap_or_default();
    let distances = response.distances.into_iter().next().unwrap_or_default();

    ids.into_iter()
        .enumerate()
        .map(|(i, chunk_id)| {
            let metadata = metadatas
                .get(i)
                .and_then(|m| m.clone())
                .unwrap_or_default();
            let field = |key: &str| {
                metadata
                    .get(key)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };

            RetrievalResult {
                document_id: field("document_id"),
                document_title: field("title"),
                content: documents.get(i).cloned().flatten().unwrap_or_default(),
                score: distances.get(i).copied().unwrap_or(f32::MAX),
                chunk_id,
                metadata,
            }
        })
        .collect()
}

// --- Chroma API types (internal) ---

#[derive(Debug, Deserialize)]
struct ChromaCollection {
    id: String,
}

#[derive(Debug, Deserialize, Default)]
struct ChromaQueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<serde_json::Map<String, serde_json::Value>>>>,
    #[serde(default)]
    distances: Vec<Vec<f32>>,
}
