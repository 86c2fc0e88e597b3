//! The completion orchestrator — the heart of Groundcrew.
//!
//! A request flows through one of three entry points on [`ChatService`]:
//!
//! 1. **Direct** — build the effective message list, call the backend,
//!    account tokens and cost, return a [`CompletionResult`]
//! 2. **Context-augmented (RAG)** — retrieve tenant knowledge for the
//!    latest user message, inject it as grounding context, then delegate
//!    to the direct path (degrading silently when there is nothing to
//!    retrieve or no tenant to retrieve for)
//! 3. **Streaming** — forward backend deltas as [`StreamEvent`]s,
//!    accumulating completion tokens as they arrive and closing the
//!    stream with exactly one terminal event
//!
//! Usage records are handed to the sink from a detached task; the request
//! path never waits for accounting.

pub mod context;
pub mod service;
pub mod stream;

pub use context::{assemble, inject};
pub use service::{ChatRequest, ChatService, CompletionResult};
pub use stream::StreamEvent;

#[cfg(test)]
pub(crate) mod test_helpers;
