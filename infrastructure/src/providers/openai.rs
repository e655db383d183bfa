//! OpenAI-compatible Chat Completions adapter (SSE).
//!
//! Serves both OpenAI and OpenRouter; they differ only in base URL,
//! credential and a few optional headers.

use super::frame::{FrameFormat, parse_sse_frame};
use super::http;
use super::stream::{FrameOutcome, FrameParser, decode_stream};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thinktank_application::ports::llm_adapter::{AdapterError, LlmAdapter, StreamHandle};
use thinktank_domain::{ApiProviderSettings, CompletionRequest, ProviderKind, StreamChunk, TokenUsage};
use tracing::debug;

pub struct OpenAiAdapter {
    client: reqwest::Client,
    kind: ProviderKind,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiAdapter {
    pub fn new(
        client: reqwest::Client,
        settings: &ApiProviderSettings,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::with_kind(ProviderKind::OpenAi, client, settings, api_key, model)
    }

    /// OpenRouter speaks the same protocol under `/api/v1`.
    pub fn openrouter(
        client: reqwest::Client,
        settings: &ApiProviderSettings,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::with_kind(ProviderKind::OpenRouter, client, settings, api_key, model)
    }

    fn with_kind(
        kind: ProviderKind,
        client: reqwest::Client,
        settings: &ApiProviderSettings,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            kind,
            api_key: api_key.into(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn to_chat_request<'a>(&self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    stream_options: StreamOptions,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<StreamHandle, AdapterError> {
        debug!("Sending streaming request to {} ({})", self.kind, request.model);

        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json");
        if self.kind == ProviderKind::OpenRouter {
            builder = builder.header("X-Title", "thinktank");
        }

        let response = http::send(builder.json(&self.to_chat_request(request))).await?;

        Ok(decode_stream(
            response.bytes_stream(),
            FrameFormat::Sse,
            OpenAiFrameParser::default(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: String,
}

/// Event mapping for Chat Completions streaming.
#[derive(Debug, Default)]
pub struct OpenAiFrameParser {
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
}

impl FrameParser for OpenAiFrameParser {
    fn parse_frame(&mut self, frame: &str) -> FrameOutcome {
        let Some(sse) = parse_sse_frame(frame) else {
            return FrameOutcome::Skip;
        };
        let data = sse.data.trim();
        if data == "[DONE]" {
            let mut chunk = StreamChunk::complete(self.finish_reason.take());
            chunk.usage = self.usage.take();
            return FrameOutcome::Chunk(chunk);
        }

        let chunk: ChatChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!("Skipping malformed chat chunk: {}", e);
                return FrameOutcome::Skip;
            }
        };

        if let Some(error) = chunk.error {
            let status = error
                .code
                .as_ref()
                .and_then(|c| c.as_u64())
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or(500);
            return FrameOutcome::Fail(if status == 429 {
                AdapterError::RateLimited(error.message)
            } else {
                AdapterError::Api {
                    status,
                    message: error.message,
                }
            });
        }

        if let Some(usage) = chunk.usage {
            self.usage = Some(TokenUsage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            return FrameOutcome::Skip;
        };
        if let Some(reason) = choice.finish_reason {
            self.finish_reason = Some(reason);
        }
        match choice.delta.and_then(|d| d.content) {
            Some(content) if !content.is_empty() => FrameOutcome::Chunk(StreamChunk::delta(content)),
            _ => FrameOutcome::Skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openrouter_endpoint_and_name() {
        let settings = ApiProviderSettings::defaults_for(ProviderKind::OpenRouter);
        let adapter = OpenAiAdapter::openrouter(reqwest::Client::new(), &settings, "k", "meta/llama");
        assert_eq!(adapter.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(adapter.name(), "openrouter");
        assert_eq!(adapter.model(), "meta/llama");
    }

    #[test]
    fn test_request_keeps_system_message_inline() {
        let settings = ApiProviderSettings::defaults_for(ProviderKind::OpenAi);
        let adapter = OpenAiAdapter::new(reqwest::Client::new(), &settings, "k", "gpt-4o");
        let request = CompletionRequest::new("gpt-4o")
            .with_system("Be terse.")
            .with_user("Hello");
        let body = serde_json::to_value(adapter.to_chat_request(&request)).unwrap();

        assert_eq!(adapter.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hello");
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    #[test]
    fn test_midstream_error_fails() {
        let mut parser = OpenAiFrameParser::default();
        let outcome =
            parser.parse_frame(r#"data: {"error":{"code":429,"message":"Rate limit exceeded"}}"#);
        assert_eq!(
            outcome,
            FrameOutcome::Fail(AdapterError::RateLimited("Rate limit exceeded".to_string()))
        );
    }
}
