//! Anthropic Messages API adapter (SSE).

use super::frame::{FrameFormat, parse_sse_frame};
use super::http;
use super::stream::{FrameOutcome, FrameParser, decode_stream};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thinktank_application::ports::llm_adapter::{AdapterError, LlmAdapter, StreamHandle};
use thinktank_domain::{ApiProviderSettings, CompletionRequest, StreamChunk, TokenUsage};
use tracing::debug;

pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    api_version: String,
    model: String,
}

impl AnthropicAdapter {
    pub fn new(
        client: reqwest::Client,
        settings: &ApiProviderSettings,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_version: settings
                .api_version
                .clone()
                .unwrap_or_else(|| "2023-06-01".to_string()),
            model: model.into(),
        }
    }

    fn to_messages_request<'a>(&self, request: &'a CompletionRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system_prompt(),
            messages: request
                .conversation()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[async_trait]
impl LlmAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<StreamHandle, AdapterError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!("Sending streaming request to Anthropic ({})", request.model);

        let response = http::send(
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", &self.api_version)
                .header("content-type", "application/json")
                .json(&self.to_messages_request(request)),
        )
        .await?;

        Ok(decode_stream(
            response.bytes_stream(),
            FrameFormat::Sse,
            AnthropicFrameParser::default(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<MessageStart>,
    #[serde(default)]
    delta: Option<EventDelta>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct MessageStart {
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct EventDelta {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Event mapping for the Messages streaming protocol.
#[derive(Debug, Default)]
pub struct AnthropicFrameParser {
    usage: TokenUsage,
    stop_reason: Option<String>,
}

impl AnthropicFrameParser {
    fn record_usage(&mut self, usage: Option<&WireUsage>) {
        if let Some(usage) = usage {
            if let Some(input) = usage.input_tokens {
                self.usage.input_tokens = input;
            }
            if let Some(output) = usage.output_tokens {
                self.usage.output_tokens = output;
            }
        }
    }
}

impl FrameParser for AnthropicFrameParser {
    fn parse_frame(&mut self, frame: &str) -> FrameOutcome {
        let Some(sse) = parse_sse_frame(frame) else {
            return FrameOutcome::Skip;
        };
        let event: StreamEvent = match serde_json::from_str(&sse.data) {
            Ok(event) => event,
            Err(e) => {
                debug!("Skipping malformed Anthropic event: {}", e);
                return FrameOutcome::Skip;
            }
        };

        match event.kind.as_str() {
            "message_start" => {
                self.record_usage(event.message.as_ref().and_then(|m| m.usage.as_ref()));
                FrameOutcome::Skip
            }
            "content_block_delta" => match event.delta {
                Some(EventDelta {
                    kind: Some(kind),
                    text: Some(text),
                    ..
                }) if kind == "text_delta" => FrameOutcome::Chunk(StreamChunk::delta(text)),
                _ => FrameOutcome::Skip,
            },
            "message_delta" => {
                if let Some(reason) = event.delta.and_then(|d| d.stop_reason) {
                    self.stop_reason = Some(reason);
                }
                self.record_usage(event.usage.as_ref());
                FrameOutcome::Skip
            }
            "message_stop" => FrameOutcome::Chunk(
                StreamChunk::complete(self.stop_reason.take()).with_usage(self.usage),
            ),
            "error" => {
                let error = event.error.unwrap_or(WireError {
                    kind: "error".to_string(),
                    message: "unknown stream error".to_string(),
                });
                FrameOutcome::Fail(match error.kind.as_str() {
                    "rate_limit_error" => AdapterError::RateLimited(error.message),
                    "overloaded_error" => AdapterError::Api {
                        status: 529,
                        message: error.message,
                    },
                    _ => AdapterError::Api {
                        status: 500,
                        message: format!("{}: {}", error.kind, error.message),
                    },
                })
            }
            // ping, content_block_start, content_block_stop and future event types
            _ => FrameOutcome::Skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: &str) -> String {
        format!("event: x\ndata: {data}")
    }

    #[test]
    fn test_request_lifts_system_prompt() {
        let adapter = AnthropicAdapter::new(
            reqwest::Client::new(),
            &ApiProviderSettings::defaults_for(thinktank_domain::ProviderKind::Anthropic),
            "key",
            "claude-sonnet-4-5",
        );
        let request = CompletionRequest::new("claude-sonnet-4-5")
            .with_system("Be terse.")
            .with_user("Hello")
            .with_max_tokens(100);
        let body = serde_json::to_value(adapter.to_messages_request(&request)).unwrap();

        assert_eq!(body["system"], "Be terse.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_ignores_non_text_deltas() {
        let mut parser = AnthropicFrameParser::default();
        let outcome = parser.parse_frame(&frame(
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{"}}"#,
        ));
        assert_eq!(outcome, FrameOutcome::Skip);
    }

    #[test]
    fn test_error_event_fails_stream() {
        let mut parser = AnthropicFrameParser::default();
        let outcome = parser.parse_frame(&frame(
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        ));
        assert_eq!(
            outcome,
            FrameOutcome::Fail(AdapterError::Api {
                status: 529,
                message: "Overloaded".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let mut parser = AnthropicFrameParser::default();
        assert_eq!(parser.parse_frame("data: {not json"), FrameOutcome::Skip);
    }
}
