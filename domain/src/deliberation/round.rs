//! Rounds, round types and contributions.

use super::divergence::Divergence;
use super::opinion::Opinion;
use crate::llm::stream::TokenUsage;
use crate::participant::entities::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundId(String);

impl RoundId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a contribution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContributionId(String);

impl ContributionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for ContributionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of round in a deliberation.
///
/// ```text
/// start ─▶ Draft ─▶ Critique ─┬─────────────▶ Synthesis ─▶ Convergence
///                             └─▶ Response ──▶    ▲             │
///                                                 │             ▼
///                                                 └──────── Refinement
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    Draft,
    Critique,
    Response,
    Synthesis,
    Convergence,
    Refinement,
}

impl RoundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundType::Draft => "draft",
            RoundType::Critique => "critique",
            RoundType::Response => "response",
            RoundType::Synthesis => "synthesis",
            RoundType::Convergence => "convergence",
            RoundType::Refinement => "refinement",
        }
    }

    /// Round types that may legally follow `previous` (`None` = no rounds yet).
    pub fn successors(previous: Option<RoundType>) -> &'static [RoundType] {
        match previous {
            None => &[RoundType::Draft],
            Some(RoundType::Draft) => &[RoundType::Critique],
            Some(RoundType::Critique) => &[RoundType::Synthesis, RoundType::Response],
            Some(RoundType::Response) => &[RoundType::Synthesis],
            Some(RoundType::Synthesis) => &[RoundType::Convergence],
            Some(RoundType::Convergence) => &[RoundType::Refinement],
            Some(RoundType::Refinement) => &[RoundType::Synthesis],
        }
    }

    pub fn can_follow(&self, previous: Option<RoundType>) -> bool {
        Self::successors(previous).contains(self)
    }

    /// Whether replies in this round are expected to carry an opinion.
    pub fn collects_opinions(&self) -> bool {
        matches!(self, RoundType::Critique | RoundType::Convergence)
    }
}

impl std::fmt::Display for RoundType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RoundType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(RoundType::Draft),
            "critique" => Ok(RoundType::Critique),
            "response" => Ok(RoundType::Response),
            "synthesis" => Ok(RoundType::Synthesis),
            "convergence" => Ok(RoundType::Convergence),
            "refinement" => Ok(RoundType::Refinement),
            other => Err(format!("unknown round type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Pending,
    InProgress,
    Complete,
    Skipped,
}

impl RoundStatus {
    pub fn is_sealed(&self) -> bool {
        matches!(self, RoundStatus::Complete | RoundStatus::Skipped)
    }
}

/// One participant's output in a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub participant_id: ParticipantId,
    pub participant_name: String,
    /// Full text, or whatever streamed before a failure
    pub content: String,
    pub opinion: Option<Opinion>,
    pub error: Option<String>,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Contribution {
    pub fn new(
        participant_id: ParticipantId,
        participant_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: ContributionId::generate(),
            participant_id,
            participant_name: participant_name.into(),
            content: content.into(),
            opinion: None,
            error: None,
            usage: TokenUsage::default(),
            finish_reason: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_finish_reason(mut self, finish_reason: Option<String>) -> Self {
        self.finish_reason = finish_reason;
        self
    }

    pub fn with_opinion(mut self, opinion: Opinion) -> Self {
        self.opinion = Some(opinion);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A single round of deliberation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    /// 1-based, monotonic within a session
    pub number: u32,
    pub round_type: RoundType,
    pub status: RoundStatus,
    /// In participant order
    pub contributions: Vec<Contribution>,
    pub divergences: Vec<Divergence>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Round {
    pub fn new(number: u32, round_type: RoundType) -> Self {
        Self {
            id: RoundId::generate(),
            number,
            round_type,
            status: RoundStatus::Pending,
            contributions: Vec::new(),
            divergences: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        if self.status == RoundStatus::Pending {
            self.status = RoundStatus::InProgress;
            self.started_at = Some(Utc::now());
        }
    }

    /// Add a contribution. Ignored once the round is sealed.
    pub fn push_contribution(&mut self, contribution: Contribution) {
        if !self.is_sealed() {
            self.contributions.push(contribution);
        }
    }

    /// Seal as complete. No-op if already sealed.
    pub fn complete(&mut self) {
        self.seal(RoundStatus::Complete);
    }

    /// Seal as skipped (cancelled). No-op if already sealed.
    pub fn skip(&mut self) {
        self.seal(RoundStatus::Skipped);
    }

    fn seal(&mut self, status: RoundStatus) {
        if self.is_sealed() {
            return;
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    pub fn is_sealed(&self) -> bool {
        self.status.is_sealed()
    }

    /// Contributions that finished without error.
    pub fn successful_contributions(&self) -> impl Iterator<Item = &Contribution> {
        self.contributions.iter().filter(|c| !c.is_error())
    }

    /// `(participant_name, content)` pairs of successful contributions, for prompt context.
    pub fn named_contents(&self) -> Vec<(String, String)> {
        self.successful_contributions()
            .map(|c| (c.participant_name.clone(), c.content.clone()))
            .collect()
    }

    pub fn opinions(&self) -> impl Iterator<Item = (&Contribution, &Opinion)> {
        self.contributions
            .iter()
            .filter_map(|c| c.opinion.as_ref().map(|o| (c, o)))
    }

    pub fn total_usage(&self) -> TokenUsage {
        self.contributions
            .iter()
            .fold(TokenUsage::default(), |acc, c| acc + c.usage)
    }
}
