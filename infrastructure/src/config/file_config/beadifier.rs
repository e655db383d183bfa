//! Beadifier configuration from TOML (`[beadifier]` section)

use super::ConfigValidationError;
use super::participants::model_config;
use serde::{Deserialize, Serialize};
use thinktank_application::BeadifierConfig;
use thinktank_domain::{ModelConfig, ProviderKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBeadifierConfig {
    /// Provider for the extraction model (default: anthropic)
    pub provider: Option<String>,
    /// Extraction model; the first participant's model is used when unset
    pub model: Option<String>,
    /// Upper bound on extraction requests
    pub max_tasks: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Parent epic for generated tracker commands
    pub epic: Option<String>,
}

impl Default for FileBeadifierConfig {
    fn default() -> Self {
        let defaults = BeadifierConfig::default();
        Self {
            provider: None,
            model: None,
            max_tasks: defaults.max_tasks,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            epic: None,
        }
    }
}

impl FileBeadifierConfig {
    pub fn to_beadifier_config(&self) -> BeadifierConfig {
        BeadifierConfig::default()
            .with_max_tasks(self.max_tasks)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// The dedicated extraction model, if one is configured.
    pub fn model_config(&self) -> Result<Option<ModelConfig>, ConfigValidationError> {
        let Some(model) = &self.model else {
            return Ok(None);
        };
        let provider = self
            .provider
            .clone()
            .unwrap_or_else(|| ProviderKind::default().to_string());
        model_config(
            "beadifier",
            &provider,
            model,
            Some(self.temperature),
            Some(self.max_tokens),
        )
        .map(Some)
    }
}
