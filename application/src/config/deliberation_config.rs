//! Deliberation loop parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Controls the orchestrator's loop, convergence test and timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliberationConfig {
    /// Maximum number of refinement cycles after the first convergence vote.
    pub max_rounds: usize,
    /// Minimum convergence score (0.0 to 1.0) for consensus.
    pub convergence_threshold: f64,
    /// Per-participant time limit for one round. `None` disables it.
    pub round_timeout: Option<Duration>,
    /// Broadcast channel capacity for progress events.
    pub event_capacity: usize,
    /// Run a Response round between Critique and Synthesis.
    pub include_response_round: bool,
}

impl Default for DeliberationConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            convergence_threshold: 0.75,
            round_timeout: Some(Duration::from_secs(180)),
            event_capacity: 1024,
            include_response_round: false,
        }
    }
}

impl DeliberationConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_round_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.round_timeout = timeout;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn with_response_round(mut self, enabled: bool) -> Self {
        self.include_response_round = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeliberationConfig::default();
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.convergence_threshold, 0.75);
        assert_eq!(config.round_timeout, Some(Duration::from_secs(180)));
        assert!(!config.include_response_round);
    }

    #[test]
    fn test_builder_clamps() {
        let config = DeliberationConfig::default()
            .with_convergence_threshold(1.5)
            .with_event_capacity(0);
        assert_eq!(config.convergence_threshold, 1.0);
        assert_eq!(config.event_capacity, 1);
    }
}
