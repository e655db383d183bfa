//! Streaming chunks produced by provider adapters.
//!
//! Every adapter, whatever its wire protocol, reduces its output to a
//! sequence of [`StreamChunk`]s that ends with exactly one chunk whose
//! `is_complete` flag is set. [`Completion`] is what you get by draining
//! such a sequence.

use serde::{Deserialize, Serialize};

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Merge another report into this one, keeping the larger count per
    /// field. Providers report cumulative counts, so the max is the latest.
    pub fn merge(&mut self, other: TokenUsage) {
        self.input_tokens = self.input_tokens.max(other.input_tokens);
        self.output_tokens = self.output_tokens.max(other.output_tokens);
    }
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens + rhs.input_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
        }
    }
}

/// One normalized piece of a streaming response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Text produced since the previous chunk (may be empty).
    pub delta: String,
    /// Set on the final chunk only.
    pub is_complete: bool,
    pub finish_reason: Option<String>,
    /// Usage, typically only present on the final chunk.
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delta: text.into(),
            is_complete: false,
            finish_reason: None,
            usage: None,
        }
    }

    pub fn complete(finish_reason: Option<String>) -> Self {
        Self {
            delta: String::new(),
            is_complete: true,
            finish_reason,
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// A fully drained response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: TokenUsage,
}

impl Completion {
    /// Fold one chunk into the accumulated completion.
    ///
    /// Returns `true` when the chunk was the terminal one.
    pub fn absorb(&mut self, chunk: &StreamChunk) -> bool {
        self.content.push_str(&chunk.delta);
        if let Some(usage) = chunk.usage {
            self.usage.merge(usage);
        }
        if chunk.is_complete {
            self.finish_reason = chunk.finish_reason.clone();
        }
        chunk.is_complete
    }
}
