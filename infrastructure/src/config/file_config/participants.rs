//! Participant roster from TOML (`[[participants]]` array)

use super::ConfigValidationError;
use serde::{Deserialize, Serialize};
use thinktank_domain::{ModelConfig, Participant, ParticipantRole, ProviderKind};

/// A provider/model pair, used for primary models and fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileModelRef {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl FileModelRef {
    /// Resolve into a [`ModelConfig`]; `field` names the entry in errors.
    ///
    /// Unset sampling knobs inherit from `base`.
    pub fn to_model_config(
        &self,
        field: &str,
        base: &ModelConfig,
    ) -> Result<ModelConfig, ConfigValidationError> {
        model_config(
            field,
            &self.provider,
            &self.model,
            self.temperature.or(Some(base.temperature)),
            self.max_tokens.or(Some(base.max_tokens)),
        )
    }
}

/// One `[[participants]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileParticipantConfig {
    /// Stable id; generated when omitted
    pub id: Option<String>,
    pub name: String,
    /// `architect`, `critic`, `advocate`, `synthesizer`, `specialist:<area>`
    /// or free text
    pub role: Option<String>,
    pub provider: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    /// Tried in order when the primary model is unavailable
    pub fallbacks: Vec<FileModelRef>,
}

impl FileParticipantConfig {
    /// Resolve into a participant plus its fallback model configs.
    pub fn to_participant(
        &self,
        index: usize,
    ) -> Result<(Participant, Vec<ModelConfig>), ConfigValidationError> {
        let field = format!("participants[{index}]");
        let model = model_config(
            &field,
            &self.provider,
            &self.model,
            self.temperature,
            self.max_tokens,
        )?;

        let name = if self.name.trim().is_empty() {
            format!("Participant {}", index + 1)
        } else {
            self.name.trim().to_string()
        };
        let fallbacks = self
            .fallbacks
            .iter()
            .enumerate()
            .map(|(i, f)| f.to_model_config(&format!("{field}.fallbacks[{i}]"), &model))
            .collect::<Result<Vec<_>, _>>()?;

        let mut participant = Participant::new(name, model);
        if let Some(id) = self.id.as_deref().filter(|id| !id.trim().is_empty()) {
            participant = participant.with_id(id.trim());
        }
        if let Some(role) = self.role.as_deref().filter(|r| !r.trim().is_empty()) {
            // Infallible: unknown roles become custom descriptors.
            if let Ok(role) = role.parse::<ParticipantRole>() {
                participant = participant.with_role(role);
            }
        }
        if let Some(prompt) = &self.system_prompt {
            participant = participant.with_system_prompt(prompt.clone());
        }

        Ok((participant, fallbacks))
    }

    /// Every issue with this entry, without stopping at the first.
    pub(crate) fn issues(&self, index: usize) -> Vec<ConfigValidationError> {
        let field = format!("participants[{index}]");
        let mut issues = model_issues(&field, &self.provider, &self.model);
        for (i, fallback) in self.fallbacks.iter().enumerate() {
            issues.extend(model_issues(
                &format!("{field}.fallbacks[{i}]"),
                &fallback.provider,
                &fallback.model,
            ));
        }
        issues
    }
}

pub(crate) fn model_issues(field: &str, provider: &str, model: &str) -> Vec<ConfigValidationError> {
    let mut issues = Vec::new();
    if provider.parse::<ProviderKind>().is_err() {
        issues.push(ConfigValidationError::UnknownProvider {
            field: field.to_string(),
            value: provider.to_string(),
        });
    }
    if model.trim().is_empty() {
        issues.push(ConfigValidationError::EmptyModelName {
            field: field.to_string(),
        });
    }
    issues
}

pub(crate) fn model_config(
    field: &str,
    provider: &str,
    model: &str,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
) -> Result<ModelConfig, ConfigValidationError> {
    let kind = provider
        .parse::<ProviderKind>()
        .map_err(|_| ConfigValidationError::UnknownProvider {
            field: field.to_string(),
            value: provider.to_string(),
        })?;
    if model.trim().is_empty() {
        return Err(ConfigValidationError::EmptyModelName {
            field: field.to_string(),
        });
    }

    let mut config = ModelConfig::new(kind, model.trim());
    if let Some(t) = temperature {
        config = config.with_temperature(t);
    }
    if let Some(m) = max_tokens {
        config = config.with_max_tokens(m);
    }
    Ok(config)
}
