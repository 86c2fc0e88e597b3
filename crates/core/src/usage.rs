//! Usage accounting types and the sink trait.
//!
//! A `UsageRecord` is built once per completion (blocking or streamed),
//! owned transiently by the orchestrator, and handed to a `UsageSink` as
//! a fire-and-forget side effect. The service never retains it after
//! handoff, and a sink failure must never fail or delay the response
//! already produced.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UsageError;
use crate::retrieval::TenantId;

/// Caller identity attached to a single request.
///
/// Carries the tenant scope used for retrieval isolation and the user the
/// usage record is attributed to. Requests without a scope skip both
/// retrieval and usage logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestScope {
    pub user_id: i64,
    pub org_id: i64,
}

impl RequestScope {
    pub fn new(user_id: i64, org_id: i64) -> Self {
        Self { user_id, org_id }
    }

    /// The tenant scope for retrieval queries.
    pub fn tenant(&self) -> TenantId {
        TenantId(self.org_id)
    }
}

/// The accounting record for one completion.
///
/// Identity fields are absent when the request carried no scope; such
/// records are never dispatched to the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,

    /// The model that actually served the request (not the caller's
    /// requested default).
    pub model: String,

    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,

    /// Estimated cost in USD.
    pub estimated_cost: f64,

    /// The backend's response id, or a generated id for streams.
    pub request_id: String,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// External collaborator that receives usage records.
///
/// Called from a detached task; implementations should be quick to fail
/// and must not assume the request is still in flight.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn record(&self, record: UsageRecord) -> std::result::Result<(), UsageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_tenant_is_org() {
        let scope = RequestScope::new(7, 42);
        assert_eq!(scope.tenant(), TenantId(42));
    }

    #[test]
    fn record_serialization_roundtrip() {
        let record = UsageRecord {
            user_id: Some(7),
            org_id: Some(42),
            model: "gpt-4o".into(),
            prompt_tokens: 120,
            completion_tokens: 48,
            total_tokens: 168,
            estimated_cost: 0.0065,
            request_id: "chatcmpl-abc".into(),
            metadata: serde_json::Map::new(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let roundtrip: UsageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.total_tokens, 168);
        assert!((roundtrip.estimated_cost - 0.0065).abs() < 1e-12);
        // Empty metadata is omitted on the wire
        assert!(!json.contains("metadata"));
    }
}
