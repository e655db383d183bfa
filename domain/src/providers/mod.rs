//! Provider connection settings (provider-neutral, serde-free).
//!
//! These types describe where and how to reach each provider without
//! depending on any serialization format; the infrastructure config layer
//! fills them in from TOML/env.

use crate::participant::model_config::ProviderKind;

/// Connection settings for every supported provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub anthropic: ApiProviderSettings,
    pub openai: ApiProviderSettings,
    pub openrouter: ApiProviderSettings,
    pub ollama: ApiProviderSettings,
}

impl ProviderSettings {
    pub fn get(&self, kind: ProviderKind) -> &ApiProviderSettings {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::OpenRouter => &self.openrouter,
            ProviderKind::Ollama => &self.ollama,
        }
    }

    pub fn get_mut(&mut self, kind: ProviderKind) -> &mut ApiProviderSettings {
        match kind {
            ProviderKind::Anthropic => &mut self.anthropic,
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::OpenRouter => &mut self.openrouter,
            ProviderKind::Ollama => &mut self.ollama,
        }
    }
}

/// Settings for one HTTP provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiProviderSettings {
    /// Environment variable holding the API key. `None` for providers that
    /// need no credential (Ollama).
    pub api_key_env: Option<String>,
    /// Direct API key (not recommended, use the env var instead).
    pub api_key: Option<String>,
    pub base_url: String,
    /// Version header, Anthropic only.
    pub api_version: Option<String>,
}

impl ApiProviderSettings {
    pub fn defaults_for(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Anthropic => Self {
                api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
                api_key: None,
                base_url: "https://api.anthropic.com".to_string(),
                api_version: Some("2023-06-01".to_string()),
            },
            ProviderKind::OpenAi => Self {
                api_key_env: Some("OPENAI_API_KEY".to_string()),
                api_key: None,
                base_url: "https://api.openai.com".to_string(),
                api_version: None,
            },
            ProviderKind::OpenRouter => Self {
                api_key_env: Some("OPENROUTER_API_KEY".to_string()),
                api_key: None,
                base_url: "https://openrouter.ai/api".to_string(),
                api_version: None,
            },
            ProviderKind::Ollama => Self {
                api_key_env: None,
                api_key: None,
                base_url: "http://localhost:11434".to_string(),
                api_version: None,
            },
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            anthropic: ApiProviderSettings::defaults_for(ProviderKind::Anthropic),
            openai: ApiProviderSettings::defaults_for(ProviderKind::OpenAi),
            openrouter: ApiProviderSettings::defaults_for(ProviderKind::OpenRouter),
            ollama: ApiProviderSettings::defaults_for(ProviderKind::Ollama),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_provider() {
        let settings = ProviderSettings::default();
        assert_eq!(
            settings.get(ProviderKind::Anthropic).api_key_env.as_deref(),
            Some("ANTHROPIC_API_KEY")
        );
        assert_eq!(
            settings.get(ProviderKind::OpenRouter).base_url,
            "https://openrouter.ai/api"
        );
        assert!(settings.get(ProviderKind::Ollama).api_key_env.is_none());
    }
}
