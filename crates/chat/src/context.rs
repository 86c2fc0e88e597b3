//! Grounding context assembly and injection.
//!
//! `assemble` turns ranked retrieval results into a single grounding
//! block; `inject` merges that block into the conversation as a system
//! directive. Injection replaces the content of the first existing
//! system message, or prepends a new one when the conversation has none.
//! With no grounding text, injection is the identity — the conversation
//! reaches the backend unmodified.

use groundcrew_core::message::{Message, Role};
use groundcrew_core::retrieval::RetrievalResult;

/// Concatenate retrieval results into a grounding block, one titled
/// section per result, in ranked order. Every provided result is
/// included — the limit is enforced upstream at retrieval.
pub fn assemble(results: &[RetrievalResult]) -> String {
    let mut grounding = String::new();
    for result in results {
        grounding.push_str(&format!(
            "--- {} ---\n{}\n\n",
            result.document_title, result.content
        ));
    }
    grounding
}

/// The directive wrapped around the grounding block.
fn grounding_directive(grounding: &str) -> String {
    format!(
        "Answer the question using the following reference material:\n\n\
         {grounding}\
         When the reference material does not contain the answer, fall back \
         to what you already know. Cite the titles of the documents you \
         referenced at the end of your answer."
    )
}

/// Merge grounding text into the conversation.
///
/// The first system message's content is replaced with the directive;
/// any later system messages are left untouched. When no system message
/// exists, the directive is prepended at position 0. Empty grounding
/// returns the conversation unchanged.
pub fn inject(messages: Vec<Message>, grounding: &str) -> Vec<Message> {
    if grounding.is_empty() {
        return messages;
    }

    let directive = grounding_directive(grounding);
    let mut messages = messages;

    match messages.iter_mut().find(|m| m.role == Role::System) {
        Some(system) => system.content = directive,
        None => messages.insert(0, Message::system(directive)),
    }

    messages
}
