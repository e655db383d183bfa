//! Beadifier parameters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeadifierConfig {
    /// Upper bound on extraction requests per run.
    pub max_tasks: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for BeadifierConfig {
    fn default() -> Self {
        Self {
            max_tasks: 20,
            temperature: 0.3,
            max_tokens: 512,
        }
    }
}

impl BeadifierConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_tasks(mut self, max: usize) -> Self {
        self.max_tasks = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
