//! RetrievalIndex trait — the abstraction over the tenant-scoped vector
//! store.
//!
//! Each tenant owns a logically isolated collection; a tenant without a
//! collection is indistinguishable from one whose index holds nothing
//! relevant — both produce an empty result set. Only transport and query
//! failures are errors, so callers can always tell "nothing relevant"
//! apart from "retrieval broke".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RetrievalError;

/// The tenant (organization) scope for retrieval and usage accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub i64);

impl TenantId {
    /// The backing-store collection name for this tenant.
    pub fn collection_name(&self) -> String {
        format!("org_{}", self.0)
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata equality filter applied at query time.
///
/// Every entry must match the chunk's metadata exactly for the chunk to
/// be returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub fields: BTreeMap<String, String>,
}

impl SearchFilter {
    /// Filter on a single metadata field.
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(key.into(), value.into());
        Self { fields }
    }

    /// Restrict results to a document category.
    pub fn category(value: impl Into<String>) -> Self {
        Self::equals("category", value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One ranked knowledge fragment returned by a retrieval query.
///
/// Produced fresh per query and never persisted by this service. `score`
/// is the store's distance: **ascending, lower = more relevant**. Result
/// order is the ranked order; consumers must not re-sort assuming
/// similarity-descending scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The chunk's id in the backing store.
    pub chunk_id: String,

    /// The document this chunk was split from.
    pub document_id: String,

    /// Human-readable title of the parent document.
    pub document_title: String,

    /// The chunk text.
    pub content: String,

    /// Distance to the query embedding (ascending = more relevant).
    pub score: f32,

    /// Chunk metadata as stored at indexing time.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// The retrieval index abstraction.
///
/// Owns no state itself — implementations delegate to an external vector
/// store, passing the tenant scope through for isolation.
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    /// Query the tenant's collection for the `limit` most relevant chunks.
    ///
    /// Returns results ordered by ascending distance. A missing collection
    /// yields `Ok(vec![])`; errors indicate the index itself failed.
    async fn search(
        &self,
        tenant: TenantId,
        query: &str,
        filter: Option<&SearchFilter>,
        limit: usize,
    ) -> std::result::Result<Vec<RetrievalResult>, RetrievalError>;
}
