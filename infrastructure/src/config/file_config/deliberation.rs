//! Deliberation loop configuration from TOML (`[deliberation]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thinktank_application::DeliberationConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDeliberationConfig {
    /// Maximum number of refinement cycles
    pub max_rounds: usize,
    /// Agreement ratio required for consensus, in [0, 1]
    pub convergence_threshold: f64,
    /// Per-participant timeout in seconds (omit to disable)
    pub round_timeout_secs: Option<u64>,
    /// Broadcast channel capacity for progress events
    pub event_capacity: usize,
    /// Run a Response round between Critique and Synthesis
    pub response_round: bool,
}

impl Default for FileDeliberationConfig {
    fn default() -> Self {
        let defaults = DeliberationConfig::default();
        Self {
            max_rounds: defaults.max_rounds,
            convergence_threshold: defaults.convergence_threshold,
            round_timeout_secs: defaults.round_timeout.map(|t| t.as_secs()),
            event_capacity: defaults.event_capacity,
            response_round: defaults.include_response_round,
        }
    }
}

impl FileDeliberationConfig {
    pub fn to_deliberation_config(&self) -> DeliberationConfig {
        DeliberationConfig::default()
            .with_max_rounds(self.max_rounds)
            .with_convergence_threshold(self.convergence_threshold)
            .with_round_timeout(self.round_timeout_secs.map(Duration::from_secs))
            .with_event_capacity(self.event_capacity)
            .with_response_round(self.response_round)
    }
}
