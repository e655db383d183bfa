//! Atomicity rules for bead tasks.

use super::task::BeadTask;
use thiserror::Error;

pub const MAX_TITLE_CHARS: usize = 80;
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Title fragments that indicate more than one step.
pub const COMPOUND_MARKERS: [&str; 4] = [" and ", " then ", " also ", " plus "];

/// Reason a candidate task was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("Title is empty")]
    EmptyTitle,

    #[error("Title is {0} characters (max 80)")]
    TitleTooLong(usize),

    #[error("Description is {0} characters (max 200)")]
    DescriptionTooLong(usize),

    #[error("Title combines steps with '{}'", .0.trim())]
    CompoundTitle(&'static str),
}

/// Check a candidate against every atomicity rule, reporting all failures.
pub fn validate_task(task: &BeadTask) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let title = task.title.trim();
    if title.is_empty() {
        issues.push(ValidationIssue::EmptyTitle);
    }
    let title_len = title.chars().count();
    if title_len > MAX_TITLE_CHARS {
        issues.push(ValidationIssue::TitleTooLong(title_len));
    }
    let description_len = task.description.trim().chars().count();
    if description_len > MAX_DESCRIPTION_CHARS {
        issues.push(ValidationIssue::DescriptionTooLong(description_len));
    }

    let lowered = format!(" {} ", title.to_lowercase());
    if let Some(marker) = COMPOUND_MARKERS.iter().find(|m| lowered.contains(*m)) {
        issues.push(ValidationIssue::CompoundTitle(*marker));
    }

    issues
}

pub fn is_valid(task: &BeadTask) -> bool {
    validate_task(task).is_empty()
}
