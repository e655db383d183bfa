//! Divergence detection within a single round.

use super::opinion::Stance;
use super::round::Round;
use crate::participant::entities::ParticipantId;
use serde::{Deserialize, Serialize};

/// Topic used for the single whole-proposal divergence.
pub const PRIMARY_TOPIC: &str = "Primary approach";

/// One participant's side in a divergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergentPosition {
    pub participant_id: ParticipantId,
    pub participant_name: String,
    pub position: String,
    pub stance: Stance,
}

/// A disagreement between participants on some topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub topic: String,
    pub positions: Vec<DivergentPosition>,
    pub resolved: bool,
    pub resolution: Option<String>,
}

impl Divergence {
    pub fn new(topic: impl Into<String>, positions: Vec<DivergentPosition>) -> Self {
        Self {
            topic: topic.into(),
            positions,
            resolved: false,
            resolution: None,
        }
    }

    pub fn resolve(&mut self, resolution: impl Into<String>) {
        self.resolved = true;
        self.resolution = Some(resolution.into());
    }
}

/// Detect divergences among the opinions recorded in `round`.
///
/// Opinionated contributions are split into agree-leaning and
/// disagree-leaning buckets. When both buckets are populated, a single
/// unresolved [`Divergence`] on [`PRIMARY_TOPIC`] is reported carrying one
/// position per opinionated contribution (partial stances included).
pub fn detect_divergences(round: &Round) -> Vec<Divergence> {
    let mut agreeing = 0usize;
    let mut disagreeing = 0usize;
    let mut positions = Vec::new();

    for (contribution, opinion) in round.opinions() {
        if opinion.stance.is_agreeing() {
            agreeing += 1;
        } else if opinion.stance.is_disagreeing() {
            disagreeing += 1;
        }
        let position = if opinion.reasoning.trim().is_empty() {
            crate::core::string::truncate(contribution.content.trim(), 200)
        } else {
            opinion.reasoning.clone()
        };
        positions.push(DivergentPosition {
            participant_id: contribution.participant_id.clone(),
            participant_name: contribution.participant_name.clone(),
            position,
            stance: opinion.stance,
        });
    }

    if agreeing == 0 || disagreeing == 0 {
        return Vec::new();
    }
    vec![Divergence::new(PRIMARY_TOPIC, positions)]
}
