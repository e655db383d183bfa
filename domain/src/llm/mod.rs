//! Provider-neutral LLM request and streaming types.

pub mod request;
pub mod stream;
