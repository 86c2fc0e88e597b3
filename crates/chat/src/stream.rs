//! Streaming events and the wire-frame encoder.
//!
//! `StreamEvent` is what the orchestrator emits per delta; the encoder
//! maps events to event-stream frames. Exactly one terminal event
//! (`Done` or `Error`) closes every stream, and no frame may follow the
//! terminal frame — the orchestrator enforces the ordering, the encoder
//! the byte format.

use serde::{Deserialize, Serialize};

/// Media type for the streaming response body.
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// The terminal non-error frame, byte-exact.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// One event in a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// An incremental fragment of generated text.
    Delta { content: String },

    /// A backend failure mid-stream. Terminal.
    Error { message: String },

    /// Normal exhaustion of the stream. Terminal.
    Done,
}

impl StreamEvent {
    /// Whether this event closes the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }

    /// Encode this event as a wire frame (`data: <json>\n\n`, with the
    /// literal `data: [DONE]\n\n` sentinel for `Done`).
    pub fn to_sse_frame(&self) -> String {
        match self {
            Self::Delta { content } => {
                format!("data: {}\n\n", serde_json::json!({ "content": content }))
            }
            Self::Error { message } => {
                format!("data: {}\n\n", serde_json::json!({ "error": message }))
            }
            Self::Done => DONE_FRAME.to_string(),
        }
    }
}
