//! Deliberation event surface
//!
//! Progress is fanned out over a `tokio::sync::broadcast` channel. Publishing
//! never blocks; a subscriber that falls behind by more than the channel
//! capacity loses the oldest events and sees `RecvError::Lagged`.

use serde::{Deserialize, Serialize};
use thinktank_domain::{ConvergenceScore, ParticipantId, RoundType, SessionId, TokenUsage};
use tokio::sync::broadcast;

/// Events emitted while a session deliberates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForgeEvent {
    RoundStarted {
        session_id: SessionId,
        round_number: u32,
        round_type: RoundType,
    },
    ParticipantThinking {
        round_number: u32,
        participant_id: ParticipantId,
        participant_name: String,
    },
    ContentDelta {
        round_number: u32,
        participant_id: ParticipantId,
        delta: String,
    },
    /// Emitted once per participant per round, also after a failure.
    ParticipantComplete {
        round_number: u32,
        participant_id: ParticipantId,
        participant_name: String,
        content: String,
        usage: TokenUsage,
        error: Option<String>,
    },
    RoundComplete {
        round_number: u32,
        round_type: RoundType,
        contributions: usize,
        errors: usize,
        divergences: usize,
    },
    ConvergenceEvaluated {
        round_number: u32,
        score: ConvergenceScore,
    },
    DeliberationFinished {
        session_id: SessionId,
        converged: bool,
        score: f64,
        rounds_run: usize,
        refinements: usize,
    },
    Error {
        round_number: Option<u32>,
        participant_id: Option<ParticipantId>,
        message: String,
    },
}

impl ForgeEvent {
    /// Short event name, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ForgeEvent::RoundStarted { .. } => "round_started",
            ForgeEvent::ParticipantThinking { .. } => "participant_thinking",
            ForgeEvent::ContentDelta { .. } => "content_delta",
            ForgeEvent::ParticipantComplete { .. } => "participant_complete",
            ForgeEvent::RoundComplete { .. } => "round_complete",
            ForgeEvent::ConvergenceEvaluated { .. } => "convergence_evaluated",
            ForgeEvent::DeliberationFinished { .. } => "deliberation_finished",
            ForgeEvent::Error { .. } => "error",
        }
    }
}

/// Broadcast publisher for [`ForgeEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ForgeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers. Having none is not an error.
    pub fn publish(&self, event: ForgeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ForgeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
