//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Provider names stay strings here so that [`FileConfig::validate`] can
//! report every bad entry at once instead of failing deserialization on
//! the first.

mod beadifier;
mod deliberation;
mod logging;
mod participants;
mod providers;

pub use beadifier::FileBeadifierConfig;
pub use deliberation::FileDeliberationConfig;
pub use logging::FileLoggingConfig;
pub use participants::{FileModelRef, FileParticipantConfig};
pub use providers::{FileProviderConfig, FileProvidersConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use thinktank_domain::{ModelConfig, Participant};

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("{field}: unknown provider '{value}' (expected anthropic, openai, openrouter or ollama)")]
    UnknownProvider { field: String, value: String },

    #[error("{field}: model name cannot be empty")]
    EmptyModelName { field: String },

    #[error("deliberation.convergence_threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("deliberation.round_timeout_secs cannot be 0")]
    InvalidTimeout,

    #[error("beadifier.max_tasks cannot be 0")]
    ZeroMaxTasks,

    #[error("no participants configured; add at least one [[participants]] entry")]
    NoParticipants,

    #[error("duplicate participant id '{0}'")]
    DuplicateParticipantId(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Round loop settings
    pub deliberation: FileDeliberationConfig,
    /// Provider endpoints and credentials
    pub providers: FileProvidersConfig,
    /// Debate roster
    pub participants: Vec<FileParticipantConfig>,
    /// Task extraction settings
    pub beadifier: FileBeadifierConfig,
    /// Log destinations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        let threshold = self.deliberation.convergence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            issues.push(ConfigValidationError::ThresholdOutOfRange(threshold));
        }
        if self.deliberation.round_timeout_secs == Some(0) {
            issues.push(ConfigValidationError::InvalidTimeout);
        }

        if self.participants.is_empty() {
            issues.push(ConfigValidationError::NoParticipants);
        }
        let mut ids = HashSet::new();
        for (index, participant) in self.participants.iter().enumerate() {
            issues.extend(participant.issues(index));
            if let Some(id) = participant.id.as_deref().map(str::trim)
                && !id.is_empty()
                && !ids.insert(id)
            {
                issues.push(ConfigValidationError::DuplicateParticipantId(id.to_string()));
            }
        }

        if self.beadifier.max_tasks == 0 {
            issues.push(ConfigValidationError::ZeroMaxTasks);
        }
        if let Some(model) = &self.beadifier.model {
            let provider = self.beadifier.provider.as_deref().unwrap_or("anthropic");
            issues.extend(participants::model_issues("beadifier", provider, model));
        }

        issues
    }

    /// Resolve the roster into participants and their fallback chains.
    pub fn participants(&self) -> Result<Vec<(Participant, Vec<ModelConfig>)>, ConfigValidationError> {
        self.participants
            .iter()
            .enumerate()
            .map(|(index, p)| p.to_participant(index))
            .collect()
    }
}
