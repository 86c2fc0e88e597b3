//! Completion backend implementation for Groundcrew.
//!
//! The backend implements the `groundcrew_core::CompletionBackend` trait
//! against any OpenAI-compatible `/v1/chat/completions` endpoint.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatBackend;
