//! Ollama chat adapter (newline-delimited JSON, no credential).

use super::frame::FrameFormat;
use super::http;
use super::stream::{FrameOutcome, FrameParser, decode_stream};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thinktank_application::ports::llm_adapter::{AdapterError, LlmAdapter, StreamHandle};
use thinktank_domain::{ApiProviderSettings, CompletionRequest, StreamChunk, TokenUsage};
use tracing::debug;

pub struct OllamaAdapter {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaAdapter {
    pub fn new(client: reqwest::Client, settings: &ApiProviderSettings, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        }
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
            stream: true,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[async_trait]
impl LlmAdapter for OllamaAdapter {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<StreamHandle, AdapterError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!("Sending streaming request to Ollama ({})", request.model);

        let response = http::send(self.client.post(&url).json(&self.to_chat_request(request))).await?;

        Ok(decode_stream(
            response.bytes_stream(),
            FrameFormat::Ndjson,
            OllamaFrameParser::default(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<LineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineMessage {
    #[serde(default)]
    content: String,
}

/// Line mapping for `/api/chat` streaming.
#[derive(Debug, Default)]
pub struct OllamaFrameParser;

impl FrameParser for OllamaFrameParser {
    fn parse_frame(&mut self, frame: &str) -> FrameOutcome {
        let line: ChatLine = match serde_json::from_str(frame.trim()) {
            Ok(line) => line,
            Err(e) => {
                debug!("Skipping malformed Ollama line: {}", e);
                return FrameOutcome::Skip;
            }
        };

        if let Some(error) = line.error {
            return FrameOutcome::Fail(AdapterError::Api {
                status: 500,
                message: error,
            });
        }

        let delta = line.message.map(|m| m.content).unwrap_or_default();
        if line.done {
            let mut chunk = StreamChunk::complete(line.done_reason).with_usage(TokenUsage::new(
                line.prompt_eval_count.unwrap_or(0),
                line.eval_count.unwrap_or(0),
            ));
            chunk.delta = delta;
            return FrameOutcome::Chunk(chunk);
        }
        if delta.is_empty() {
            FrameOutcome::Skip
        } else {
            FrameOutcome::Chunk(StreamChunk::delta(delta))
        }
    }
}
