//! Participant entities

use super::model_config::ModelConfig;
use serde::{Deserialize, Serialize};

/// Unique identifier for a participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a ParticipantId from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new random ParticipantId.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The perspective a participant is asked to argue from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Architect,
    Critic,
    Advocate,
    Synthesizer,
    /// Domain specialist, e.g. `Specialist("security")`
    Specialist(String),
    /// Free-form role description
    Custom(String),
}

impl ParticipantRole {
    /// One-sentence role descriptor injected into the participant's system prompt.
    pub fn descriptor(&self) -> String {
        match self {
            ParticipantRole::Architect => {
                "You are the architect: favour coherent structure, clear boundaries and long-term maintainability.".to_string()
            }
            ParticipantRole::Critic => {
                "You are the critic: hunt for flaws, hidden assumptions, risks and missing requirements.".to_string()
            }
            ParticipantRole::Advocate => {
                "You are the advocate: argue for the strongest version of each idea and for the people who will use it.".to_string()
            }
            ParticipantRole::Synthesizer => {
                "You are the synthesizer: reconcile competing positions into one consistent proposal.".to_string()
            }
            ParticipantRole::Specialist(area) => {
                format!("You are a specialist in {}: weigh every proposal against that expertise.", area)
            }
            ParticipantRole::Custom(description) => description.clone(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ParticipantRole::Architect => "architect",
            ParticipantRole::Critic => "critic",
            ParticipantRole::Advocate => "advocate",
            ParticipantRole::Synthesizer => "synthesizer",
            ParticipantRole::Specialist(_) => "specialist",
            ParticipantRole::Custom(_) => "custom",
        }
    }
}

impl std::str::FromStr for ParticipantRole {
    type Err = std::convert::Infallible;

    /// Parses `architect`, `critic`, `advocate`, `synthesizer`,
    /// `specialist:<area>`; anything else becomes a custom role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_lowercase().as_str() {
            "architect" => ParticipantRole::Architect,
            "critic" => ParticipantRole::Critic,
            "advocate" => ParticipantRole::Advocate,
            "synthesizer" => ParticipantRole::Synthesizer,
            lower if lower.starts_with("specialist:") => {
                ParticipantRole::Specialist(trimmed["specialist:".len()..].trim().to_string())
            }
            _ => ParticipantRole::Custom(trimmed.to_string()),
        })
    }
}

/// One configured debate entity (Entity).
///
/// Human participants contribute out-of-band and are skipped by the
/// orchestrator when it fans out a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub is_human: bool,
    pub model: ModelConfig,
    pub role: Option<ParticipantRole>,
    pub system_prompt: String,
}

impl Participant {
    /// Create a model-backed participant with a generated id.
    pub fn new(name: impl Into<String>, model: ModelConfig) -> Self {
        Self {
            id: ParticipantId::generate(),
            name: name.into(),
            is_human: false,
            model,
            role: None,
            system_prompt: String::new(),
        }
    }

    /// Create a human participant.
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            is_human: true,
            ..Self::new(name, ModelConfig::new(Default::default(), ""))
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = ParticipantId::new(id);
        self
    }

    pub fn with_role(mut self, role: ParticipantRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Whether this participant acts as the session's synthesizer.
    pub fn is_synthesizer(&self) -> bool {
        matches!(self.role, Some(ParticipantRole::Synthesizer))
    }
}
