//! LLM provider adapters.
//!
//! Each adapter turns a [`CompletionRequest`](thinktank_domain::CompletionRequest)
//! into one streaming HTTP call and decodes the provider's wire format into
//! [`StreamChunk`](thinktank_domain::StreamChunk)s:
//!
//! | Provider   | Endpoint                   | Framing |
//! |------------|----------------------------|---------|
//! | Anthropic  | `/v1/messages`             | SSE     |
//! | OpenAI     | `/v1/chat/completions`     | SSE     |
//! | OpenRouter | `/api/v1/chat/completions` | SSE     |
//! | Ollama     | `/api/chat`                | NDJSON  |

pub mod anthropic;
pub mod fallback;
pub mod frame;
mod http;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod stream;

pub use fallback::FallbackAdapter;
pub use registry::{CredentialSource, EnvCredentials, ProviderRegistry};
