//! Usage sink implementations.
//!
//! `HttpUsageSink` posts usage records to the external accounting
//! service; `NoopUsageSink` drops them (accounting disabled, tests).
//! Both are only ever called from a detached task — delivery failures
//! are the caller's to log, never to propagate.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use groundcrew_core::{UsageError, UsageRecord, UsageSink};

/// HTTP sink posting records to the accounting service's `usage/log`
/// endpoint.
pub struct HttpUsageSink {
    base_url: String,
    service_token: Option<String>,
    client: reqwest::Client,
}

impl HttpUsageSink {
    /// Create a sink for the given accounting service.
    pub fn new(
        base_url: impl Into<String>,
        service_token: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_token,
            client,
        }
    }
}

/// Wire payload for the accounting service (camelCase field names).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UsagePayload {
    user_id: Option<i64>,
    org_id: Option<i64>,
    api_type: &'static str,
    tokens_used: u32,
    estimated_cost: f64,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl UsagePayload {
    fn from_record(record: UsageRecord) -> Self {
        let mut metadata = record.metadata;
        metadata.insert("model".into(), record.model.into());
        metadata.insert("promptTokens".into(), record.prompt_tokens.into());
        metadata.insert("completionTokens".into(), record.completion_tokens.into());
        metadata.insert("requestId".into(), record.request_id.into());

        Self {
            user_id: record.user_id,
            org_id: record.org_id,
            api_type: "chat",
            tokens_used: record.total_tokens,
            estimated_cost: record.estimated_cost,
            metadata,
        }
    }
}

#[async_trait]
impl UsageSink for HttpUsageSink {
    async fn record(&self, record: UsageRecord) -> Result<(), UsageError> {
        let url = format!("{}/usage/log", self.base_url);
        let payload = UsagePayload::from_record(record);

        let mut request = self.client.post(&url).json(&payload);
        if let Some(token) = &self.service_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| UsageError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UsageError::Delivery(format!(
                "accounting service returned {status}: {body}"
            )));
        }

        debug!("Usage record delivered");
        Ok(())
    }
}

/// Sink that discards every record.
pub struct NoopUsageSink;

#[async_trait]
impl UsageSink for NoopUsageSink {
    async fn record(&self, _record: UsageRecord) -> Result<(), UsageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> UsageRecord {
        UsageRecord {
            user_id: Some(7),
            org_id: Some(42),
            model: "gpt-4o".into(),
            prompt_tokens: 100,
            completion_tokens: 40,
            total_tokens: 140,
            estimated_cost: 0.0054,
            request_id: "chatcmpl-abc".into(),
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn payload_is_camel_case() {
        let payload = UsagePayload::from_record(record());
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#""userId":7"#));
        assert!(json.contains(r#""orgId":42"#));
        assert!(json.contains(r#""apiType":"chat""#));
        assert!(json.contains(r#""tokensUsed":140"#));
        assert!(json.contains(r#""estimatedCost""#));
    }

    #[test]
    fn payload_metadata_carries_breakdown() {
        let payload = UsagePayload::from_record(record());
        assert_eq!(
            payload.metadata.get("model").and_then(|v| v.as_str()),
            Some("gpt-4o")
        );
        assert_eq!(
            payload.metadata.get("promptTokens").and_then(|v| v.as_u64()),
            Some(100)
        );
        assert_eq!(
            payload.metadata.get("requestId").and_then(|v| v.as_str()),
            Some("chatcmpl-abc")
        );
    }

    #[tokio::test]
    async fn noop_sink_accepts_everything() {
        assert!(NoopUsageSink.record(record()).await.is_ok());
    }

    #[tokio::test]
    async fn http_sink_reports_unreachable_service() {
        // Port 9 (discard) is never listening
        let sink = HttpUsageSink::new("http://127.0.0.1:9", None, 1);
        let result = sink.record(record()).await;
        assert!(matches!(result, Err(UsageError::Delivery(_))));
    }
}
