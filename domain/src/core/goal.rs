//! Goal value object

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// The goal a think-tank session deliberates on (Value Object)
///
/// Always non-empty; surrounding whitespace is trimmed on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Goal {
    content: String,
}

impl Goal {
    /// Create a new goal, rejecting empty or whitespace-only text
    pub fn new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidGoal(
                "goal cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            content: trimmed.to_string(),
        })
    }

    /// Get the goal text
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

impl TryFrom<String> for Goal {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Goal::new(value)
    }
}

impl From<Goal> for String {
    fn from(goal: Goal) -> Self {
        goal.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_trims_whitespace() {
        let goal = Goal::new("  Design a TODO API \n").unwrap();
        assert_eq!(goal.content(), "Design a TODO API");
    }

    #[test]
    fn test_empty_goal_rejected() {
        assert!(matches!(Goal::new("   "), Err(DomainError::InvalidGoal(_))));
    }

    #[test]
    fn test_goal_serde_validates() {
        let goal: Goal = serde_json::from_str("\"Ship it\"").unwrap();
        assert_eq!(goal.to_string(), "Ship it");
        assert!(serde_json::from_str::<Goal>("\"\"").is_err());
    }
}
