//! LLM adapter port
//!
//! Defines the single capability set every provider adapter exposes. The
//! orchestrator and beadifier only ever see `Arc<dyn LlmAdapter>`; which
//! wire protocol sits behind it is decided by the infrastructure registry.

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use thinktank_domain::{Completion, CompletionRequest, StreamChunk};
use thiserror::Error;

/// Errors that can occur while talking to a provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Missing API key for {provider}: set {env_var}")]
    MissingApiKey { provider: String, env_var: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Timeout")]
    Timeout,

    #[error("Cancelled")]
    Cancelled,

    #[error("Stream ended before completion")]
    Incomplete,
}

impl AdapterError {
    /// Whether a fallback provider may be tried after this error.
    ///
    /// Only errors raised before any output was produced and that another
    /// provider could plausibly avoid qualify.
    pub fn is_fallback_eligible(&self) -> bool {
        match self {
            AdapterError::Network(_)
            | AdapterError::RateLimited(_)
            | AdapterError::MissingApiKey { .. } => true,
            AdapterError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Handle for consuming a provider's chunk stream.
///
/// The stream is lazy, finite and not restartable. A well-formed stream ends
/// right after one chunk with `is_complete` set; a failed one ends after a
/// single `Err` item.
pub struct StreamHandle {
    inner: BoxStream<'static, Result<StreamChunk, AdapterError>>,
}

impl StreamHandle {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<StreamChunk, AdapterError>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Build a handle from pre-computed items.
    pub fn from_chunks(chunks: Vec<Result<StreamChunk, AdapterError>>) -> Self {
        Self::new(futures::stream::iter(chunks))
    }

    pub async fn next(&mut self) -> Option<Result<StreamChunk, AdapterError>> {
        self.inner.next().await
    }

    /// Drain the stream into a [`Completion`].
    ///
    /// Fails with the first stream error, or with [`AdapterError::Incomplete`]
    /// when the stream ends without a completion chunk.
    pub async fn collect(mut self) -> Result<Completion, AdapterError> {
        let mut completion = Completion::default();
        while let Some(chunk) = self.next().await {
            if completion.absorb(&chunk?) {
                return Ok(completion);
            }
        }
        Err(AdapterError::Incomplete)
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Capability set of a language model provider
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Provider name, e.g. "anthropic"
    fn name(&self) -> &str;

    /// Model identifier sent to the provider
    fn model(&self) -> &str;

    /// Open a streaming completion.
    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<StreamHandle, AdapterError>;

    /// Non-streaming completion, defined as draining [`complete_stream`](Self::complete_stream).
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, AdapterError> {
        self.complete_stream(request).await?.collect().await
    }
}
