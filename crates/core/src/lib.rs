//! # Groundcrew Core
//!
//! Domain types, traits, and error definitions for the Groundcrew RAG
//! orchestration service. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: the completion
//! backend, the retrieval index, and the usage sink. Implementations live
//! in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod backend;
pub mod error;
pub mod message;
pub mod retrieval;
pub mod usage;

// Re-export key types at crate root for ergonomics
pub use backend::{
    BackendRequest, BackendResponse, CompletionBackend, EmbeddingRequest, EmbeddingResponse,
    StreamChunk, TokenUsage,
};
pub use error::{BackendError, Error, Result, RetrievalError, UsageError};
pub use message::{Message, Role};
pub use retrieval::{RetrievalIndex, RetrievalResult, SearchFilter, TenantId};
pub use usage::{RequestScope, UsageRecord, UsageSink};
