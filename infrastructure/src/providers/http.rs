//! Shared HTTP plumbing for provider adapters.

use thinktank_application::ports::llm_adapter::AdapterError;
use tracing::debug;

/// Send a request and return the response if its status is a success.
pub(crate) async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, AdapterError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("Provider returned {}: {}", status, body);
    Err(status_error(status.as_u16(), &body))
}

pub(crate) fn transport_error(error: reqwest::Error) -> AdapterError {
    if error.is_timeout() {
        AdapterError::Timeout
    } else {
        AdapterError::Network(error.to_string())
    }
}

/// Map a non-success HTTP status and body onto an [`AdapterError`].
pub(crate) fn status_error(status: u16, body: &str) -> AdapterError {
    let message = error_message(body);
    if status == 429 {
        AdapterError::RateLimited(message)
    } else {
        AdapterError::Api { status, message }
    }
}

/// Extract a human-readable message from an error body.
///
/// Understands `{"error": {"message": ...}}` (Anthropic, OpenAI, OpenRouter)
/// and `{"error": "..."}` (Ollama); anything else is returned trimmed.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let error = value.get("error");
        if let Some(message) = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
        if let Some(message) = error.and_then(|e| e.as_str()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        thinktank_domain::core::string::truncate(trimmed, 500)
    }
}
