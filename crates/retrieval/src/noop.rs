//! No-op retrieval index, used when retrieval is disabled.
//!
//! Every search returns the empty result set, so context-augmented
//! completions take their documented no-context fallback path.

use async_trait::async_trait;

use groundcrew_core::error::RetrievalError;
use groundcrew_core::retrieval::{RetrievalIndex, RetrievalResult, SearchFilter, TenantId};

pub struct NoopIndex;

#[async_trait]
impl RetrievalIndex for NoopIndex {
    async fn search(
        &self,
        _tenant: TenantId,
        _query: &str,
        _filter: Option<&SearchFilter>,
        _limit: usize,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_empty() {
        let results = NoopIndex
            .search(TenantId(1), "anything", None, 5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
