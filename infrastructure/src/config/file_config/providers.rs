//! Provider configuration from TOML (`[providers]` section)
//!
//! Every field is optional; unset fields keep the provider's built-in
//! defaults (see [`ApiProviderSettings::defaults_for`]).

use serde::{Deserialize, Serialize};
use thinktank_domain::{ApiProviderSettings, ProviderKind, ProviderSettings};

/// Overrides for one HTTP provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Environment variable name for the API key.
    pub api_key_env: Option<String>,
    /// Direct API key (not recommended, use the env var instead).
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Anthropic API version header.
    pub api_version: Option<String>,
}

impl FileProviderConfig {
    fn apply(&self, kind: ProviderKind) -> ApiProviderSettings {
        let mut settings = ApiProviderSettings::defaults_for(kind);
        if let Some(env) = &self.api_key_env {
            settings.api_key_env = Some(env.clone());
        }
        if self.api_key.is_some() {
            settings.api_key = self.api_key.clone();
        }
        if let Some(url) = &self.base_url {
            settings.base_url = url.clone();
        }
        if self.api_version.is_some() {
            settings.api_version = self.api_version.clone();
        }
        settings
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    pub anthropic: FileProviderConfig,
    pub openai: FileProviderConfig,
    pub openrouter: FileProviderConfig,
    pub ollama: FileProviderConfig,
}

impl FileProvidersConfig {
    pub fn to_provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            anthropic: self.anthropic.apply(ProviderKind::Anthropic),
            openai: self.openai.apply(ProviderKind::OpenAi),
            openrouter: self.openrouter.apply(ProviderKind::OpenRouter),
            ollama: self.ollama.apply(ProviderKind::Ollama),
        }
    }
}
