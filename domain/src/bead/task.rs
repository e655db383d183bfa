//! Atomic implementation tasks ("beads").

use serde::{Deserialize, Serialize};

/// Tracker priority, P0 (critical) to P4 (backlog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    #[default]
    P2,
    P3,
    P4,
}

impl Priority {
    pub fn as_u8(&self) -> u8 {
        match self {
            Priority::P0 => 0,
            Priority::P1 => 1,
            Priority::P2 => 2,
            Priority::P3 => 3,
            Priority::P4 => 4,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Priority::P0),
            1 => Some(Priority::P1),
            2 => Some(Priority::P2),
            3 => Some(Priority::P3),
            4 => Some(Priority::P4),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.as_u8())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    /// Accepts `P0`..`P4` (any case) or a bare digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix(['P', 'p'])
            .unwrap_or(trimmed);
        digits
            .parse::<u8>()
            .ok()
            .and_then(Priority::from_u8)
            .ok_or_else(|| format!("invalid priority: {s}"))
    }
}

/// Tracker issue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeadType {
    #[default]
    Task,
    Bug,
    Feature,
    Docs,
}

impl BeadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeadType::Task => "task",
            BeadType::Bug => "bug",
            BeadType::Feature => "feature",
            BeadType::Docs => "docs",
        }
    }
}

impl std::fmt::Display for BeadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BeadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "task" | "chore" => Ok(BeadType::Task),
            "bug" | "fix" => Ok(BeadType::Bug),
            "feature" | "feat" => Ok(BeadType::Feature),
            "docs" | "doc" | "documentation" => Ok(BeadType::Docs),
            other => Err(format!("invalid task type: {other}")),
        }
    }
}

/// One atomic task extracted from a consensus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeadTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub task_type: BeadType,
    /// Titles of earlier tasks this one depends on
    pub dependencies: Vec<String>,
}

impl BeadTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority: Priority::default(),
            task_type: BeadType::default(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_type(mut self, task_type: BeadType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_parsing() {
        assert_eq!("P0".parse::<Priority>().unwrap(), Priority::P0);
        assert_eq!("p3".parse::<Priority>().unwrap(), Priority::P3);
        assert_eq!("4".parse::<Priority>().unwrap(), Priority::P4);
        assert!("P9".parse::<Priority>().is_err());
        assert!("high".parse::<Priority>().is_err());
    }

    #[test]
    fn test_bead_type_parsing() {
        assert_eq!("Feature".parse::<BeadType>().unwrap(), BeadType::Feature);
        assert_eq!("documentation".parse::<BeadType>().unwrap(), BeadType::Docs);
        assert!("epic".parse::<BeadType>().is_err());
    }
}
