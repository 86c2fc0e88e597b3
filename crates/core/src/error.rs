//! Error types for the Groundcrew domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. Only backend and
//! retrieval failures ever reach callers; usage-sink failures are
//! swallowed by the orchestrator after logging.

use thiserror::Error;

/// The top-level error type for all Groundcrew operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Retrieval index errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Usage sink errors ---
    #[error("Usage logging error: {0}")]
    Usage(#[from] UsageError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures from the completion backend. The variants classify the cause
/// (auth, rate limit, timeout, other) for diagnostics; the orchestrator
/// surfaces them all uniformly as a completion failure and never retries.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

/// Failures querying the retrieval index. Distinct from an empty result
/// set: a tenant without a collection yields `Ok(vec![])`, never one of
/// these.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Index store unreachable: {0}")]
    Store(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),
}

/// Failures delivering a usage record to the external sink.
#[derive(Debug, Clone, Error)]
pub enum UsageError {
    #[error("Usage record delivery failed: {0}")]
    Delivery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_displays_correctly() {
        let err = Error::Backend(BackendError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn retrieval_error_displays_correctly() {
        let err = Error::Retrieval(RetrievalError::Store("connection refused".into()));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn retrieval_error_distinct_from_backend() {
        let retrieval: Error = RetrievalError::QueryFailed("bad filter".into()).into();
        let backend: Error = BackendError::Timeout("120s elapsed".into()).into();
        assert!(matches!(retrieval, Error::Retrieval(_)));
        assert!(matches!(backend, Error::Backend(_)));
    }

    #[test]
    fn usage_error_displays_correctly() {
        let err = UsageError::Delivery("503 from accounting service".into());
        assert!(err.to_string().contains("503"));
    }
}
