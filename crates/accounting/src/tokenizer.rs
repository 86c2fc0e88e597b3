//! Tokenizer resolution — maps a model name to a BPE token counter.
//!
//! Resolution matches the model name by substring against a small family
//! table: anything carrying a `gpt-4` marker uses the gpt-4 family
//! encoding, a `gpt-3.5` marker uses the 3.5 family encoding, and every
//! other name falls back to the default encoding. Resolution never fails —
//! an unrecognized model silently counts with the default.
//!
//! Message-list counting adds the chat protocol's wire framing cost: a
//! fixed per-message overhead plus a fixed reply-priming overhead on top
//! of the per-field (role + content) token counts.

use groundcrew_core::Message;
use tiktoken_rs::CoreBPE;

/// Framing tokens the wire protocol spends per message (delimiters,
/// role markers).
const TOKENS_PER_MESSAGE: usize = 3;

/// Tokens spent priming the assistant reply at the end of the prompt.
const REPLY_PRIMING_TOKENS: usize = 3;

/// The tokenizer family a model name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// gpt-4 generation models (o200k encoding)
    Gpt4,
    /// gpt-3.5 generation models (cl100k encoding)
    Gpt35,
    /// Everything else (cl100k encoding)
    Default,
}

impl Family {
    /// Match a model name to its family by substring.
    fn of(model: &str) -> Self {
        if model.contains("gpt-4") {
            Self::Gpt4
        } else if model.contains("gpt-3.5") {
            Self::Gpt35
        } else {
            Self::Default
        }
    }
}

/// A token counter for one model family.
pub struct Tokenizer {
    family: Family,
    bpe: CoreBPE,
}

/// Resolve a model name to its tokenizer. Never fails.
pub fn resolve(model: &str) -> Tokenizer {
    let family = Family::of(model);
    let bpe = match family {
        Family::Gpt4 => tiktoken_rs::o200k_base(),
        Family::Gpt35 | Family::Default => tiktoken_rs::cl100k_base(),
    }
    .unwrap_or_else(|_| tiktoken_rs::cl100k_base().expect("cl100k_base encoding is bundled"));

    Tokenizer { family, bpe }
}

impl Tokenizer {
    /// Which family this tokenizer counts for.
    pub fn family(&self) -> Family {
        self.family
    }

    /// Count the tokens in a text fragment.
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Count the tokens a message list occupies on the wire, including
    /// per-message framing and the reply priming overhead.
    pub fn count_messages(&self, messages: &[Message]) -> usize {
        let mut total = 0;
        for message in messages {
            total += TOKENS_PER_MESSAGE;
            total += self.count(&message.role.to_string());
            total += self.count(&message.content);
        }
        total + REPLY_PRIMING_TOKENS
    }
}
