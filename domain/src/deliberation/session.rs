//! Deliberation session aggregate.

use super::round::{Contribution, Round, RoundType};
use crate::core::goal::Goal;
use crate::participant::entities::{Participant, ParticipantId};
use serde::{Deserialize, Serialize};

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A goal, the participants debating it and the rounds run so far.
///
/// Rounds are appended by the orchestrator that owns the session; nothing
/// else should push to `rounds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub goal: Goal,
    pub rounds: Vec<Round>,
    pub participants: Vec<Participant>,
}

impl Session {
    pub fn new(goal: Goal) -> Self {
        Self {
            id: SessionId::generate(),
            goal,
            rounds: Vec::new(),
            participants: Vec::new(),
        }
    }

    pub fn with_participant(mut self, participant: Participant) -> Self {
        self.participants.push(participant);
        self
    }

    pub fn has_started(&self) -> bool {
        !self.rounds.is_empty()
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn next_round_number(&self) -> u32 {
        self.rounds.last().map_or(1, |r| r.number + 1)
    }

    pub fn latest_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    /// Type of the latest completed round; skipped rounds do not advance the
    /// state machine.
    pub fn latest_round_type(&self) -> Option<RoundType> {
        self.rounds
            .iter()
            .rev()
            .find(|r| r.status == super::round::RoundStatus::Complete)
            .map(|r| r.round_type)
    }

    pub fn latest_round_of(&self, round_type: RoundType) -> Option<&Round> {
        self.rounds.iter().rev().find(|r| r.round_type == round_type)
    }

    /// The canonical synthesis text: the synthesizer's contribution to the
    /// latest Synthesis round, else its first successful contribution.
    pub fn latest_synthesis(&self) -> Option<&Contribution> {
        let round = self.latest_round_of(RoundType::Synthesis)?;
        round
            .successful_contributions()
            .find(|c| {
                self.participant(&c.participant_id)
                    .is_some_and(Participant::is_synthesizer)
            })
            .or_else(|| round.successful_contributions().next())
    }

    pub fn refinement_count(&self) -> usize {
        self.rounds
            .iter()
            .filter(|r| r.round_type == RoundType::Refinement)
            .count()
    }

    pub fn push_round(&mut self, round: Round) {
        self.rounds.push(round);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliberation::round::RoundStatus;
    use crate::participant::entities::ParticipantRole;
    use crate::participant::model_config::{ModelConfig, ProviderKind};

    fn session_with_two() -> Session {
        let model = ModelConfig::new(ProviderKind::Anthropic, "m");
        Session::new(Goal::new("Design a cache").unwrap())
            .with_participant(Participant::new("A", model.clone()).with_id("a"))
            .with_participant(
                Participant::new("S", model)
                    .with_id("s")
                    .with_role(ParticipantRole::Synthesizer),
            )
    }

    fn synthesis_round(number: u32) -> Round {
        let mut round = Round::new(number, RoundType::Synthesis);
        round.push_contribution(Contribution::new(ParticipantId::new("a"), "A", "from A"));
        round.push_contribution(Contribution::new(ParticipantId::new("s"), "S", "from S"));
        round.complete();
        round
    }

    #[test]
    fn test_round_numbers_are_monotonic() {
        let mut session = session_with_two();
        assert_eq!(session.next_round_number(), 1);
        session.push_round(Round::new(1, RoundType::Draft));
        assert_eq!(session.next_round_number(), 2);
        assert!(session.has_started());
    }

    #[test]
    fn test_latest_synthesis_prefers_synthesizer() {
        let mut session = session_with_two();
        session.push_round(synthesis_round(3));
        assert_eq!(session.latest_synthesis().unwrap().content, "from S");
    }

    #[test]
    fn test_latest_synthesis_falls_back_to_first_success() {
        let mut session = session_with_two();
        let mut round = Round::new(3, RoundType::Synthesis);
        round.push_contribution(Contribution::new(ParticipantId::new("a"), "A", "from A"));
        round.push_contribution(
            Contribution::new(ParticipantId::new("s"), "S", "").with_error("boom"),
        );
        session.push_round(round);
        assert_eq!(session.latest_synthesis().unwrap().content, "from A");
    }

    #[test]
    fn test_skipped_round_does_not_advance_state() {
        let mut session = session_with_two();
        let mut draft = Round::new(1, RoundType::Draft);
        draft.complete();
        session.push_round(draft);
        let mut critique = Round::new(2, RoundType::Critique);
        critique.skip();
        session.push_round(critique);

        assert_eq!(session.latest_round().unwrap().status, RoundStatus::Skipped);
        assert_eq!(session.latest_round_type(), Some(RoundType::Draft));
    }
}
