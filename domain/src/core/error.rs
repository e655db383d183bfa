//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DomainError::UnknownProvider("gemini".to_string()).to_string(),
            "Unknown provider: gemini"
        );
        assert_eq!(
            DomainError::InvalidGoal("goal is empty".to_string()).to_string(),
            "Invalid goal: goal is empty"
        );
    }
}
