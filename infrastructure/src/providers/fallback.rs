//! Ordered fallback across adapters.

use async_trait::async_trait;
use std::sync::Arc;
use thinktank_application::ports::llm_adapter::{AdapterError, LlmAdapter, StreamHandle};
use thinktank_domain::{CompletionRequest, ModelConfig};
use tracing::warn;

/// Tries each adapter in turn until one opens a stream.
///
/// Only failures to open the stream fall through, and only when
/// [`AdapterError::is_fallback_eligible`] holds. Errors after the first
/// chunk belong to the caller.
pub struct FallbackAdapter {
    adapters: Vec<(Arc<dyn LlmAdapter>, Option<ModelConfig>)>,
}

impl FallbackAdapter {
    /// `adapters` must not be empty. Fallbacks keep the caller's sampling
    /// settings and only swap the model name.
    pub fn new(adapters: Vec<Arc<dyn LlmAdapter>>) -> Self {
        Self {
            adapters: adapters.into_iter().map(|a| (a, None)).collect(),
        }
    }

    /// Pair each adapter with its model config. Fallbacks then send their
    /// own temperature and max tokens.
    pub fn with_configs(adapters: Vec<(Arc<dyn LlmAdapter>, ModelConfig)>) -> Self {
        Self {
            adapters: adapters
                .into_iter()
                .map(|(adapter, config)| (adapter, Some(config)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// The request as fallback `adapter` should see it.
    fn retarget(
        request: &CompletionRequest,
        adapter: &dyn LlmAdapter,
        config: Option<&ModelConfig>,
    ) -> CompletionRequest {
        let mut request = request.clone();
        request.model = adapter.model().to_string();
        if let Some(config) = config {
            request.temperature = config.temperature;
            request.max_tokens = config.max_tokens;
        }
        request
    }
}

#[async_trait]
impl LlmAdapter for FallbackAdapter {
    fn name(&self) -> &str {
        "fallback"
    }

    fn model(&self) -> &str {
        self.adapters
            .first()
            .map(|(a, _)| a.model())
            .unwrap_or_default()
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<StreamHandle, AdapterError> {
        let mut last_error = AdapterError::Incomplete;

        for (index, (adapter, config)) in self.adapters.iter().enumerate() {
            let result = if index == 0 {
                adapter.complete_stream(request).await
            } else {
                let request = Self::retarget(request, adapter.as_ref(), config.as_ref());
                adapter.complete_stream(&request).await
            };

            match result {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_fallback_eligible() && index + 1 < self.adapters.len() => {
                    let (next, _) = &self.adapters[index + 1];
                    warn!(
                        "{}/{} failed ({}), falling back to {}/{}",
                        adapter.name(),
                        adapter.model(),
                        e,
                        next.name(),
                        next.model()
                    );
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use thinktank_domain::{ProviderKind, StreamChunk};

    struct MockAdapter {
        model: &'static str,
        error: Option<AdapterError>,
        seen_models: Mutex<Vec<String>>,
        seen_sampling: Mutex<Vec<(f32, u32)>>,
    }

    impl MockAdapter {
        fn ok(model: &'static str) -> Arc<Self> {
            Arc::new(Self {
                model,
                error: None,
                seen_models: Mutex::new(Vec::new()),
                seen_sampling: Mutex::new(Vec::new()),
            })
        }

        fn failing(model: &'static str, error: AdapterError) -> Arc<Self> {
            Arc::new(Self {
                model,
                error: Some(error),
                seen_models: Mutex::new(Vec::new()),
                seen_sampling: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen_models.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmAdapter for MockAdapter {
        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            self.model
        }

        async fn complete_stream(
            &self,
            request: &CompletionRequest,
        ) -> Result<StreamHandle, AdapterError> {
            self.seen_models.lock().unwrap().push(request.model.clone());
            self.seen_sampling
                .lock()
                .unwrap()
                .push((request.temperature, request.max_tokens));
            if let Some(e) = &self.error {
                return Err(e.clone());
            }
            Ok(StreamHandle::from_chunks(vec![
                Ok(StreamChunk::delta(self.model)),
                Ok(StreamChunk::complete(Some("stop".to_string()))),
            ]))
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("primary").with_user("hi")
    }

    #[tokio::test]
    async fn test_rate_limit_falls_back() {
        let primary = MockAdapter::failing("primary", AdapterError::RateLimited("busy".into()));
        let backup = MockAdapter::ok("backup");
        let adapter = FallbackAdapter::new(vec![primary.clone(), backup.clone()]);

        let completion = adapter.complete(&request()).await.unwrap();

        assert_eq!(completion.content, "backup");
        assert_eq!(primary.calls(), 1);
        assert_eq!(backup.seen_models.lock().unwrap().as_slice(), ["backup"]);
    }

    #[tokio::test]
    async fn test_fallback_uses_its_own_sampling() {
        let primary = MockAdapter::failing("primary", AdapterError::RateLimited("busy".into()));
        let backup = MockAdapter::ok("backup");
        let adapter = FallbackAdapter::with_configs(vec![
            (
                primary.clone() as Arc<dyn LlmAdapter>,
                ModelConfig::new(ProviderKind::Anthropic, "primary"),
            ),
            (
                backup.clone() as Arc<dyn LlmAdapter>,
                ModelConfig::new(ProviderKind::Ollama, "backup")
                    .with_temperature(0.2)
                    .with_max_tokens(512),
            ),
        ]);

        let request = request().with_temperature(0.9).with_max_tokens(2048);
        adapter.complete(&request).await.unwrap();

        assert_eq!(primary.seen_sampling.lock().unwrap().as_slice(), [(0.9, 2048)]);
        assert_eq!(backup.seen_sampling.lock().unwrap().as_slice(), [(0.2, 512)]);
        assert_eq!(backup.seen_models.lock().unwrap().as_slice(), ["backup"]);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let primary = MockAdapter::failing(
            "primary",
            AdapterError::Api {
                status: 400,
                message: "bad request".into(),
            },
        );
        let backup = MockAdapter::ok("backup");
        let adapter = FallbackAdapter::new(vec![primary, backup.clone()]);

        let err = adapter.complete(&request()).await.unwrap_err();

        assert!(matches!(err, AdapterError::Api { status: 400, .. }));
        assert_eq!(backup.calls(), 0);
    }

    #[tokio::test]
    async fn test_last_error_surfaces_when_all_fail() {
        let adapter = FallbackAdapter::new(vec![
            MockAdapter::failing("a", AdapterError::Network("reset".into())),
            MockAdapter::failing(
                "b",
                AdapterError::Api {
                    status: 503,
                    message: "unavailable".into(),
                },
            ),
        ]);

        let err = adapter.complete(&request()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_reports_primary_model() {
        let adapter = FallbackAdapter::new(vec![MockAdapter::ok("first"), MockAdapter::ok("second")]);
        assert_eq!(adapter.model(), "first");
        assert_eq!(adapter.len(), 2);
    }
}
