//! Domain layer for thinktank
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Deliberation
//!
//! A [`Session`] pits several [`Participant`]s against a [`Goal`] through
//! typed [`Round`]s:
//!
//! ```text
//! Draft ─▶ Critique ─▶ (Response) ─▶ Synthesis ─▶ Convergence ─▶ done
//!                                        ▲             │ not converged
//!                                        └── Refinement ◀┘
//! ```
//!
//! Replies in Critique and Convergence rounds are parsed into [`Opinion`]s,
//! from which [`detect_divergences`] and [`calculate_convergence`] derive
//! divergences and a [`ConvergenceScore`].
//!
//! ## Beads
//!
//! The final synthesis is decomposed into atomic [`BeadTask`]s, validated
//! by [`validate_task`] and rendered as tracker commands or spec files.

pub mod bead;
pub mod core;
pub mod deliberation;
pub mod llm;
pub mod participant;
pub mod prompt;
pub mod providers;

// Re-export commonly used types
pub use bead::{
    BeadReply, BeadTask, BeadType, Priority, SpecFile, ValidationIssue, parse_bead_reply,
    render_spec_files, render_tracker_commands, validate_task,
};
pub use core::{error::DomainError, goal::Goal};
pub use deliberation::{
    Contribution, ContributionId, ConvergenceScore, Divergence, DivergentPosition, Opinion, Round,
    RoundId, RoundStatus, RoundType, Session, SessionId, Stance, calculate_convergence,
    detect_divergences, parse_critique_opinion, parse_opinion,
};
pub use llm::{
    request::{ChatMessage, ChatRole, CompletionRequest},
    stream::{Completion, StreamChunk, TokenUsage},
};
pub use participant::{
    entities::{Participant, ParticipantId, ParticipantRole},
    model_config::{ModelConfig, ProviderKind},
};
pub use prompt::{BeadPromptTemplate, RoundPromptTemplate};
pub use providers::{ApiProviderSettings, ProviderSettings};
