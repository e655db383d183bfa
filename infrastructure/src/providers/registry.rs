use super::anthropic::AnthropicAdapter;
use super::fallback::FallbackAdapter;
use super::ollama::OllamaAdapter;
use super::openai::OpenAiAdapter;
use std::sync::Arc;
use thinktank_application::ports::llm_adapter::{AdapterError, LlmAdapter};
use thinktank_domain::{ApiProviderSettings, ModelConfig, ProviderKind, ProviderSettings};
use tracing::{debug, warn};

/// Where API keys come from.
pub trait CredentialSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads credentials from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Builds adapters from model configs.
///
/// This is the only place that knows about concrete adapter types; the rest
/// of the workspace sees `Arc<dyn LlmAdapter>`. One `reqwest::Client` is
/// shared by every adapter it builds.
pub struct ProviderRegistry {
    client: reqwest::Client,
    settings: ProviderSettings,
    credentials: Arc<dyn CredentialSource>,
}

impl ProviderRegistry {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
            credentials: Arc::new(EnvCredentials),
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialSource>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Build the adapter for one model config.
    pub fn build(&self, config: &ModelConfig) -> Result<Arc<dyn LlmAdapter>, AdapterError> {
        let settings = self.settings.get(config.provider);
        let client = self.client.clone();
        let model = config.model.clone();
        debug!("Building {} adapter for {}", config.provider, model);

        let adapter: Arc<dyn LlmAdapter> = match config.provider {
            ProviderKind::Anthropic => {
                let key = self.api_key(config.provider, settings)?;
                Arc::new(AnthropicAdapter::new(client, settings, key, model))
            }
            ProviderKind::OpenAi => {
                let key = self.api_key(config.provider, settings)?;
                Arc::new(OpenAiAdapter::new(client, settings, key, model))
            }
            ProviderKind::OpenRouter => {
                let key = self.api_key(config.provider, settings)?;
                Arc::new(OpenAiAdapter::openrouter(client, settings, key, model))
            }
            ProviderKind::Ollama => Arc::new(OllamaAdapter::new(client, settings, model)),
        };
        Ok(adapter)
    }

    /// Build `primary` followed by its fallbacks, in order.
    ///
    /// Configs that fail to build are skipped with a warning. The first
    /// construction error is returned only when nothing could be built.
    pub fn build_with_fallbacks(
        &self,
        primary: &ModelConfig,
        fallbacks: &[ModelConfig],
    ) -> Result<Arc<dyn LlmAdapter>, AdapterError> {
        let mut adapters = Vec::new();
        let mut first_error = None;

        for config in std::iter::once(primary).chain(fallbacks) {
            match self.build(config) {
                Ok(adapter) => adapters.push((adapter, config.clone())),
                Err(e) => {
                    warn!("Skipping {}/{}: {}", config.provider, config.model, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match adapters.len() {
            0 => Err(first_error.unwrap_or(AdapterError::Incomplete)),
            1 => Ok(adapters.remove(0).0),
            _ => Ok(Arc::new(FallbackAdapter::with_configs(adapters))),
        }
    }

    /// Direct key first, then the configured environment variable.
    fn api_key(
        &self,
        provider: ProviderKind,
        settings: &ApiProviderSettings,
    ) -> Result<String, AdapterError> {
        if let Some(key) = settings.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }
        let env_var = settings
            .api_key_env
            .clone()
            .or_else(|| ApiProviderSettings::defaults_for(provider).api_key_env)
            .unwrap_or_default();
        self.credentials
            .get(&env_var)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AdapterError::MissingApiKey {
                provider: provider.to_string(),
                env_var,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // -- Mock CredentialSource -------------------------------------------------

    struct MapCredentials(HashMap<String, String>);

    impl MapCredentials {
        fn with(pairs: &[(&str, &str)]) -> Arc<dyn CredentialSource> {
            Arc::new(Self(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ))
        }
    }

    impl CredentialSource for MapCredentials {
        fn get(&self, name: &str) -> Option<String> {
            self.0.get(name).cloned()
        }
    }

    fn registry(pairs: &[(&str, &str)]) -> ProviderRegistry {
        ProviderRegistry::new(ProviderSettings::default()).with_credentials(MapCredentials::with(pairs))
    }

    // -- build -----------------------------------------------------------------

    #[test]
    fn builds_adapter_for_each_provider() {
        let registry = registry(&[
            ("ANTHROPIC_API_KEY", "a"),
            ("OPENAI_API_KEY", "o"),
            ("OPENROUTER_API_KEY", "r"),
        ]);

        for kind in ProviderKind::all() {
            let adapter = registry.build(&ModelConfig::new(*kind, "m")).unwrap();
            assert_eq!(adapter.name(), kind.as_str());
            assert_eq!(adapter.model(), "m");
        }
    }

    #[test]
    fn missing_key_names_the_env_var() {
        let registry = registry(&[]);
        let err = registry
            .build(&ModelConfig::new(ProviderKind::OpenRouter, "m"))
            .err()
            .unwrap();
        assert_eq!(
            err,
            AdapterError::MissingApiKey {
                provider: "openrouter".to_string(),
                env_var: "OPENROUTER_API_KEY".to_string(),
            }
        );
    }

    #[test]
    fn configured_env_var_name_is_used() {
        let mut settings = ProviderSettings::default();
        settings.anthropic.api_key_env = Some("MY_CLAUDE_KEY".to_string());
        let registry = ProviderRegistry::new(settings)
            .with_credentials(MapCredentials::with(&[("MY_CLAUDE_KEY", "k")]));

        assert!(registry.build(&ModelConfig::new(ProviderKind::Anthropic, "m")).is_ok());
    }

    #[test]
    fn direct_key_wins_over_env() {
        let mut settings = ProviderSettings::default();
        settings.openai.api_key = Some("inline".to_string());
        let registry = ProviderRegistry::new(settings).with_credentials(MapCredentials::with(&[]));

        assert!(registry.build(&ModelConfig::new(ProviderKind::OpenAi, "m")).is_ok());
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let registry = registry(&[("ANTHROPIC_API_KEY", "  ")]);
        assert!(matches!(
            registry.build(&ModelConfig::new(ProviderKind::Anthropic, "m")),
            Err(AdapterError::MissingApiKey { .. })
        ));
    }

    // -- build_with_fallbacks --------------------------------------------------

    #[test]
    fn unbuildable_configs_are_skipped() {
        let registry = registry(&[("OPENAI_API_KEY", "o")]);
        let adapter = registry
            .build_with_fallbacks(
                &ModelConfig::new(ProviderKind::Anthropic, "claude"),
                &[ModelConfig::new(ProviderKind::OpenAi, "gpt-4o")],
            )
            .unwrap();

        // Only one survived, so it is returned unwrapped.
        assert_eq!(adapter.name(), "openai");
        assert_eq!(adapter.model(), "gpt-4o");
    }

    #[test]
    fn several_adapters_are_wrapped() {
        let registry = registry(&[("ANTHROPIC_API_KEY", "a")]);
        let adapter = registry
            .build_with_fallbacks(
                &ModelConfig::new(ProviderKind::Anthropic, "claude"),
                &[ModelConfig::new(ProviderKind::Ollama, "llama3.1")],
            )
            .unwrap();

        assert_eq!(adapter.name(), "fallback");
        assert_eq!(adapter.model(), "claude");
    }

    #[test]
    fn nothing_buildable_returns_first_error() {
        let registry = registry(&[]);
        let err = registry
            .build_with_fallbacks(
                &ModelConfig::new(ProviderKind::Anthropic, "claude"),
                &[ModelConfig::new(ProviderKind::OpenAi, "gpt-4o")],
            )
            .err()
            .unwrap();
        assert!(matches!(
            err,
            AdapterError::MissingApiKey { ref provider, .. } if provider == "anthropic"
        ));
    }
}
