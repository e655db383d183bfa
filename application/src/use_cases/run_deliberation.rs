//! Run Deliberation use case
//!
//! Drives a session's participants through the round state machine,
//! streaming every participant concurrently within a round and
//! broadcasting progress as [`ForgeEvent`]s.

use crate::config::DeliberationConfig;
use crate::ports::events::{EventBus, ForgeEvent};
use crate::ports::llm_adapter::{AdapterError, LlmAdapter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thinktank_domain::{
    CompletionRequest, Contribution, ConvergenceScore, Participant, ParticipantId, Round,
    RoundPromptTemplate, RoundType, Session, TokenUsage, calculate_convergence,
    detect_divergences, parse_critique_opinion, parse_opinion,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fatal orchestration errors. Participant failures are never reported here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("No model-backed participants in the session")]
    NoParticipants,

    #[error("Invalid round transition: {from} -> {to}")]
    InvalidTransition { from: String, to: RoundType },

    #[error("Deliberation cancelled")]
    Cancelled,

    #[error("Participants cannot be added after the first round")]
    SessionStarted,
}

/// Result of a full [`Orchestrator::deliberate`] run.
#[derive(Debug, Clone)]
pub struct DeliberationOutcome {
    pub converged: bool,
    pub score: ConvergenceScore,
    pub rounds_run: usize,
    pub refinements: usize,
}

/// Prior-round material a round's prompts are built from.
enum RoundInput {
    Goal,
    Contributions(Vec<(String, String)>),
    Synthesis(String),
    Refinement {
        synthesis: String,
        concerns: Vec<String>,
    },
}

/// Owns one session and runs its rounds.
pub struct Orchestrator {
    session: Session,
    adapters: HashMap<ParticipantId, Arc<dyn LlmAdapter>>,
    config: DeliberationConfig,
    events: EventBus,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(session: Session) -> Self {
        let config = DeliberationConfig::default();
        Self {
            session,
            adapters: HashMap::new(),
            events: EventBus::new(config.event_capacity),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the configuration. Call before [`subscribe`](Self::subscribe):
    /// a changed event capacity creates a fresh channel.
    pub fn with_config(mut self, config: DeliberationConfig) -> Self {
        if config.event_capacity != self.config.event_capacity {
            self.events = EventBus::new(config.event_capacity);
        }
        self.config = config;
        self
    }

    /// Register a participant and the adapter that speaks for it.
    ///
    /// A participant already present in the session (same id) keeps its
    /// position and gets the new adapter.
    pub fn add_participant(
        &mut self,
        participant: Participant,
        adapter: Arc<dyn LlmAdapter>,
    ) -> Result<(), OrchestratorError> {
        if self.session.has_started() {
            return Err(OrchestratorError::SessionStarted);
        }
        debug!(
            "Adding participant {} ({} / {})",
            participant.name,
            adapter.name(),
            adapter.model()
        );
        self.adapters.insert(participant.id.clone(), adapter);
        match self
            .session
            .participants
            .iter_mut()
            .find(|p| p.id == participant.id)
        {
            Some(existing) => *existing = participant,
            None => self.session.participants.push(participant),
        }
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ForgeEvent> {
        self.events.subscribe()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Consume the orchestrator, closing the event channel.
    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn config(&self) -> &DeliberationConfig {
        &self.config
    }

    /// Abort in-flight streams; the running round is sealed as skipped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Convergence of the latest Convergence round.
    pub fn convergence(&self) -> ConvergenceScore {
        calculate_convergence(&self.session.rounds, self.config.convergence_threshold)
    }

    /// Whether the last completed round was a Convergence round that did
    /// not reach consensus.
    pub fn needs_refinement(&self) -> bool {
        self.session.latest_round_type() == Some(RoundType::Convergence)
            && !self.convergence().is_converged
    }

    /// Run the whole loop: Draft, Critique, (Response), Synthesis,
    /// Convergence, then Refinement/Synthesis/Convergence cycles until
    /// consensus or `max_rounds` refinements.
    pub async fn deliberate(&mut self) -> Result<DeliberationOutcome, OrchestratorError> {
        info!(
            "Starting deliberation {} with {} participants",
            self.session.id,
            self.model_participants().len()
        );

        self.run_round(RoundType::Draft).await?;
        self.run_round(RoundType::Critique).await?;
        if self.config.include_response_round {
            self.run_round(RoundType::Response).await?;
        }
        self.run_round(RoundType::Synthesis).await?;
        self.run_round(RoundType::Convergence).await?;

        let mut refinements = 0;
        while self.needs_refinement() && refinements < self.config.max_rounds {
            refinements += 1;
            info!(
                "No consensus yet, refinement {}/{}",
                refinements, self.config.max_rounds
            );
            self.run_round(RoundType::Refinement).await?;
            self.run_round(RoundType::Synthesis).await?;
            self.run_round(RoundType::Convergence).await?;
        }

        let score = self.convergence();
        if score.is_converged {
            info!("Consensus reached (score {:.2})", score.score);
        } else {
            warn!(
                "Deliberation ended without consensus (score {:.2}, {} blocking concerns)",
                score.score,
                score.blocking_concerns.len()
            );
        }

        let outcome = DeliberationOutcome {
            converged: score.is_converged,
            rounds_run: self.session.rounds.len(),
            refinements,
            score,
        };
        self.events.publish(ForgeEvent::DeliberationFinished {
            session_id: self.session.id.clone(),
            converged: outcome.converged,
            score: outcome.score.score,
            rounds_run: outcome.rounds_run,
            refinements: outcome.refinements,
        });
        Ok(outcome)
    }

    /// Run one round of `round_type` and append it to the session.
    pub async fn run_round(&mut self, round_type: RoundType) -> Result<&Round, OrchestratorError> {
        let participants = self.model_participants();
        if participants.is_empty() {
            return Err(OrchestratorError::NoParticipants);
        }
        let previous = self.session.latest_round_type();
        let refinement_blocked = round_type == RoundType::Refinement && !self.needs_refinement();
        if !round_type.can_follow(previous) || refinement_blocked {
            return Err(OrchestratorError::InvalidTransition {
                from: previous.map_or_else(|| "start".to_string(), |t| t.to_string()),
                to: round_type,
            });
        }
        if self.cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let mut round = Round::new(self.session.next_round_number(), round_type);
        round.start();
        let number = round.number;
        info!("Round {}: {} ({} participants)", number, round_type, participants.len());
        self.events.publish(ForgeEvent::RoundStarted {
            session_id: self.session.id.clone(),
            round_number: number,
            round_type,
        });

        let input = self.round_input(round_type);
        let goal = self.session.goal.content().to_string();

        let mut join_set = JoinSet::new();
        for (index, (participant, adapter)) in participants.iter().enumerate() {
            let request = build_request(participant, round_type, &goal, &input);
            let run = ParticipantRun {
                round_number: number,
                participant: participant.clone(),
                adapter: Arc::clone(adapter),
                events: self.events.clone(),
                cancel: self.cancel.clone(),
                timeout: self.config.round_timeout,
            };
            join_set.spawn(async move { (index, run.execute(request).await) });
        }

        let mut slots: Vec<Option<Contribution>> = vec![None; participants.len()];
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((index, contribution)) => slots[index] = Some(contribution),
                Err(e) => warn!("Participant task join error: {}", e),
            }
        }

        for (slot, (participant, _)) in slots.into_iter().zip(&participants) {
            let contribution = match slot {
                Some(contribution) => contribution,
                None => {
                    let message = "participant task aborted";
                    self.events.publish(ForgeEvent::Error {
                        round_number: Some(number),
                        participant_id: Some(participant.id.clone()),
                        message: format!("{}: {}", participant.name, message),
                    });
                    self.events.publish(ForgeEvent::ParticipantComplete {
                        round_number: number,
                        participant_id: participant.id.clone(),
                        participant_name: participant.name.clone(),
                        content: String::new(),
                        usage: TokenUsage::default(),
                        error: Some(message.to_string()),
                    });
                    Contribution::new(participant.id.clone(), &participant.name, "")
                        .with_error(message)
                }
            };
            round.push_contribution(contribution);
        }

        if self.cancel.is_cancelled() {
            warn!("Round {} cancelled", number);
            round.skip();
            self.seal_round(round);
            return Err(OrchestratorError::Cancelled);
        }

        if round_type.collects_opinions() {
            for contribution in round.contributions.iter_mut().filter(|c| !c.is_error()) {
                let opinion = match round_type {
                    RoundType::Critique => parse_critique_opinion(&contribution.content),
                    _ => parse_opinion(&contribution.content),
                };
                if opinion.is_none() {
                    debug!("No opinion parsed from {}", contribution.participant_name);
                }
                contribution.opinion = opinion;
            }
        }
        round.divergences = detect_divergences(&round);
        round.complete();
        self.seal_round(round);

        if round_type == RoundType::Convergence {
            let score = self.convergence();
            info!(
                "Convergence: {:.2} ({} agree, {} partial, {} disagree)",
                score.score, score.agreement_count, score.partial_count, score.disagreement_count
            );
            self.events.publish(ForgeEvent::ConvergenceEvaluated {
                round_number: number,
                score,
            });
        }

        self.session
            .latest_round()
            .ok_or(OrchestratorError::NoParticipants)
    }

    /// Append a sealed round and announce it.
    fn seal_round(&mut self, round: Round) {
        let errors = round.contributions.iter().filter(|c| c.is_error()).count();
        debug!(
            "Round {} sealed as {:?} ({} tokens)",
            round.number,
            round.status,
            round.total_usage().total()
        );
        self.events.publish(ForgeEvent::RoundComplete {
            round_number: round.number,
            round_type: round.round_type,
            contributions: round.contributions.len(),
            errors,
            divergences: round.divergences.len(),
        });
        self.session.push_round(round);
    }

    /// Non-human participants with an adapter, in session order.
    fn model_participants(&self) -> Vec<(Participant, Arc<dyn LlmAdapter>)> {
        self.session
            .participants
            .iter()
            .filter(|p| !p.is_human)
            .filter_map(|p| {
                self.adapters
                    .get(&p.id)
                    .map(|adapter| (p.clone(), Arc::clone(adapter)))
            })
            .collect()
    }

    fn round_input(&self, round_type: RoundType) -> RoundInput {
        let contents_of = |source: RoundType| {
            self.session
                .latest_round_of(source)
                .map(Round::named_contents)
                .unwrap_or_default()
        };
        let synthesis = || {
            self.session
                .latest_synthesis()
                .map(|c| c.content.clone())
                .unwrap_or_default()
        };

        match round_type {
            RoundType::Draft => RoundInput::Goal,
            RoundType::Critique => RoundInput::Contributions(contents_of(RoundType::Draft)),
            RoundType::Response => RoundInput::Contributions(contents_of(RoundType::Critique)),
            RoundType::Synthesis => {
                let source = self
                    .session
                    .latest_round_type()
                    .unwrap_or(RoundType::Critique);
                RoundInput::Contributions(contents_of(source))
            }
            RoundType::Convergence => RoundInput::Synthesis(synthesis()),
            RoundType::Refinement => RoundInput::Refinement {
                synthesis: synthesis(),
                concerns: self.convergence().blocking_concerns,
            },
        }
    }
}

fn build_request(
    participant: &Participant,
    round_type: RoundType,
    goal: &str,
    input: &RoundInput,
) -> CompletionRequest {
    let name = participant.name.as_str();
    let prompt = match (round_type, input) {
        (RoundType::Critique, RoundInput::Contributions(drafts)) => {
            RoundPromptTemplate::critique(name, goal, drafts)
        }
        (RoundType::Response, RoundInput::Contributions(critiques)) => {
            RoundPromptTemplate::response(name, goal, critiques)
        }
        (RoundType::Synthesis, RoundInput::Contributions(inputs)) => {
            RoundPromptTemplate::synthesis(name, goal, inputs)
        }
        (_, RoundInput::Synthesis(synthesis)) => {
            RoundPromptTemplate::convergence(name, goal, synthesis)
        }
        (_, RoundInput::Refinement { synthesis, concerns }) => {
            RoundPromptTemplate::refinement(name, goal, synthesis, concerns)
        }
        _ => RoundPromptTemplate::draft(name, goal),
    };

    CompletionRequest::new(participant.model.model.clone())
        .with_system(RoundPromptTemplate::system(participant))
        .with_user(prompt)
        .with_temperature(participant.model.temperature)
        .with_max_tokens(participant.model.max_tokens)
}

/// Text and accounting gathered from one participant's stream.
#[derive(Default)]
struct Streamed {
    content: String,
    usage: TokenUsage,
    finish_reason: Option<String>,
}

/// One participant's share of a round, run inside its own task.
struct ParticipantRun {
    round_number: u32,
    participant: Participant,
    adapter: Arc<dyn LlmAdapter>,
    events: EventBus,
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl ParticipantRun {
    async fn execute(self, request: CompletionRequest) -> Contribution {
        let id = self.participant.id.clone();
        let name = self.participant.name.clone();
        self.events.publish(ForgeEvent::ParticipantThinking {
            round_number: self.round_number,
            participant_id: id.clone(),
            participant_name: name.clone(),
        });

        let mut streamed = Streamed::default();
        let outcome = {
            let stream = self.stream(&request, &mut streamed);
            let limited = async {
                match self.timeout {
                    Some(limit) => match tokio::time::timeout(limit, stream).await {
                        Ok(result) => result,
                        Err(_) => Err(AdapterError::Timeout),
                    },
                    None => stream.await,
                }
            };
            tokio::select! {
                _ = self.cancel.cancelled() => Err(AdapterError::Cancelled),
                result = limited => result,
            }
        };

        let mut contribution = Contribution::new(id.clone(), &name, streamed.content)
            .with_usage(streamed.usage)
            .with_finish_reason(streamed.finish_reason);

        if let Err(e) = &outcome {
            if *e == AdapterError::Cancelled {
                debug!("{} cancelled in round {}", name, self.round_number);
            } else {
                warn!("{} failed in round {}: {}", name, self.round_number, e);
                self.events.publish(ForgeEvent::Error {
                    round_number: Some(self.round_number),
                    participant_id: Some(id.clone()),
                    message: format!("{name}: {e}"),
                });
            }
            contribution = contribution.with_error(e.to_string());
        } else {
            debug!(
                "{} finished round {} ({} output tokens)",
                name, self.round_number, contribution.usage.output_tokens
            );
        }

        self.events.publish(ForgeEvent::ParticipantComplete {
            round_number: self.round_number,
            participant_id: id,
            participant_name: name,
            content: contribution.content.clone(),
            usage: contribution.usage,
            error: contribution.error.clone(),
        });
        contribution
    }

    async fn stream(
        &self,
        request: &CompletionRequest,
        streamed: &mut Streamed,
    ) -> Result<(), AdapterError> {
        let mut handle = self.adapter.complete_stream(request).await?;
        while let Some(chunk) = handle.next().await {
            let chunk = chunk?;
            if !chunk.delta.is_empty() {
                streamed.content.push_str(&chunk.delta);
                self.events.publish(ForgeEvent::ContentDelta {
                    round_number: self.round_number,
                    participant_id: self.participant.id.clone(),
                    delta: chunk.delta,
                });
            }
            if let Some(usage) = chunk.usage {
                streamed.usage.merge(usage);
            }
            if chunk.is_complete {
                streamed.finish_reason = chunk.finish_reason;
                return Ok(());
            }
        }
        Err(AdapterError::Incomplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_adapter::StreamHandle;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thinktank_domain::{Goal, ModelConfig, ProviderKind, RoundStatus, Stance, StreamChunk};

    const AGREE: &str = "VOTE: AGREE\nREASONING: Sound design.\nCONCERNS: none";
    const DISAGREE: &str = "VOTE: DISAGREE\nREASONING: Insecure.\nCONCERNS:\n- no auth";

    enum Behavior {
        Reply(&'static str),
        Fail(AdapterError),
        FailMidStream(&'static str, AdapterError),
        Hang,
        Panic,
    }

    struct MockAdapter {
        behavior: Behavior,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockAdapter {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn delayed(behavior: Behavior, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmAdapter for MockAdapter {
        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn complete_stream(
            &self,
            _request: &CompletionRequest,
        ) -> Result<StreamHandle, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let chunks = match &self.behavior {
                Behavior::Reply(text) => {
                    let (head, tail) = text.split_at(text.len() / 2);
                    vec![
                        Ok(StreamChunk::delta(head)),
                        Ok(StreamChunk::delta(tail)),
                        Ok(StreamChunk::complete(Some("stop".to_string()))
                            .with_usage(TokenUsage::new(10, 5))),
                    ]
                }
                Behavior::Fail(e) => return Err(e.clone()),
                Behavior::FailMidStream(partial, e) => {
                    vec![Ok(StreamChunk::delta(*partial)), Err(e.clone())]
                }
                Behavior::Hang => return Ok(StreamHandle::new(futures::stream::pending())),
                Behavior::Panic => panic!("adapter blew up"),
            };
            let delay = self.delay;
            Ok(StreamHandle::new(futures::stream::iter(chunks).then(
                move |chunk| async move {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    chunk
                },
            )))
        }
    }

    fn participant(name: &str) -> Participant {
        Participant::new(name, ModelConfig::new(ProviderKind::Anthropic, "mock-model"))
            .with_id(name.to_lowercase())
    }

    fn orchestrator(adapters: Vec<(&str, Arc<MockAdapter>)>) -> Orchestrator {
        let session = Session::new(Goal::new("Design a login service").unwrap());
        let mut orchestrator = Orchestrator::new(session);
        for (name, adapter) in adapters {
            orchestrator
                .add_participant(participant(name), adapter)
                .unwrap();
        }
        orchestrator
    }

    fn drain(rx: &mut broadcast::Receiver<ForgeEvent>) -> Vec<ForgeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_three_agreeing_participants_converge() {
        let mut orchestrator = orchestrator(vec![
            ("A", MockAdapter::new(Behavior::Reply(AGREE))),
            ("B", MockAdapter::new(Behavior::Reply(AGREE))),
            ("C", MockAdapter::new(Behavior::Reply(AGREE))),
        ]);
        let mut rx = orchestrator.subscribe();

        let outcome = orchestrator.deliberate().await.unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.score.score, 1.0);
        assert_eq!(outcome.score.agreement_count, 3);
        assert_eq!(outcome.rounds_run, 4);
        assert_eq!(outcome.refinements, 0);

        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(ForgeEvent::RoundStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(ForgeEvent::DeliberationFinished { converged: true, .. })
        ));
        let completes = events
            .iter()
            .filter(|e| matches!(e, ForgeEvent::ParticipantComplete { .. }))
            .count();
        assert_eq!(completes, 12);
        let round_completes = events
            .iter()
            .filter(|e| matches!(e, ForgeEvent::RoundComplete { .. }))
            .count();
        assert_eq!(round_completes, 4);
        assert!(events.iter().any(|e| matches!(
            e,
            ForgeEvent::ConvergenceEvaluated { round_number: 4, .. }
        )));
    }

    #[tokio::test]
    async fn test_single_dissent_reports_blocking_concern() {
        let mut orchestrator = orchestrator(vec![
            ("A", MockAdapter::new(Behavior::Reply(AGREE))),
            ("B", MockAdapter::new(Behavior::Reply(AGREE))),
            ("C", MockAdapter::new(Behavior::Reply(DISAGREE))),
        ])
        .with_config(DeliberationConfig::default().with_max_rounds(0));

        let outcome = orchestrator.deliberate().await.unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.score.disagreement_count, 1);
        assert!((outcome.score.score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(outcome.score.blocking_concerns, vec!["C: no auth"]);
        assert_eq!(outcome.refinements, 0);

        let convergence = orchestrator
            .session()
            .latest_round_of(RoundType::Convergence)
            .unwrap();
        assert_eq!(convergence.divergences.len(), 1);
        assert_eq!(convergence.divergences[0].topic, "Primary approach");
        assert_eq!(convergence.divergences[0].positions.len(), 3);
        assert!(orchestrator.needs_refinement());
    }

    #[tokio::test]
    async fn test_negated_agreement_blocks_consensus() {
        let mut orchestrator = orchestrator(vec![
            ("A", MockAdapter::new(Behavior::Reply("I agree."))),
            ("B", MockAdapter::new(Behavior::Reply("I agree."))),
            (
                "C",
                MockAdapter::new(Behavior::Reply("I do not agree: there is no auth.")),
            ),
        ])
        .with_config(DeliberationConfig::default().with_max_rounds(0));

        let outcome = orchestrator.deliberate().await.unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.score.agreement_count, 2);
        assert_eq!(outcome.score.disagreement_count, 1);
        let convergence = orchestrator
            .session()
            .latest_round_of(RoundType::Convergence)
            .unwrap();
        assert_eq!(
            convergence.contributions[2].opinion.as_ref().map(|o| o.stance),
            Some(Stance::Disagree)
        );
        assert_eq!(convergence.divergences.len(), 1);
    }

    #[tokio::test]
    async fn test_refinement_is_capped() {
        let dissenter = MockAdapter::new(Behavior::Reply(DISAGREE));
        let mut orchestrator = orchestrator(vec![
            ("A", MockAdapter::new(Behavior::Reply(AGREE))),
            ("C", Arc::clone(&dissenter)),
        ])
        .with_config(DeliberationConfig::default().with_max_rounds(2));

        let outcome = orchestrator.deliberate().await.unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.refinements, 2);
        assert_eq!(outcome.rounds_run, 4 + 2 * 3);
        assert_eq!(orchestrator.session().refinement_count(), 2);
        assert_eq!(dissenter.calls.load(Ordering::SeqCst), 10);

        let types: Vec<RoundType> = orchestrator
            .session()
            .rounds
            .iter()
            .map(|r| r.round_type)
            .collect();
        assert_eq!(
            &types[3..7],
            &[
                RoundType::Convergence,
                RoundType::Refinement,
                RoundType::Synthesis,
                RoundType::Convergence
            ]
        );
        let numbers: Vec<u32> = orchestrator.session().rounds.iter().map(|r| r.number).collect();
        assert_eq!(numbers, (1..=10).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_response_round_when_enabled() {
        let mut orchestrator = orchestrator(vec![("A", MockAdapter::new(Behavior::Reply(AGREE)))])
            .with_config(DeliberationConfig::default().with_response_round(true));

        let outcome = orchestrator.deliberate().await.unwrap();

        assert!(outcome.converged);
        assert_eq!(
            orchestrator.session().rounds[2].round_type,
            RoundType::Response
        );
        assert_eq!(outcome.rounds_run, 5);
    }

    #[tokio::test]
    async fn test_participant_failure_is_isolated() {
        let mut orchestrator = orchestrator(vec![
            ("A", MockAdapter::new(Behavior::Reply("draft A"))),
            (
                "B",
                MockAdapter::new(Behavior::Fail(AdapterError::Network("refused".into()))),
            ),
            (
                "C",
                MockAdapter::new(Behavior::FailMidStream(
                    "half a dra",
                    AdapterError::Network("reset".into()),
                )),
            ),
        ]);
        let mut rx = orchestrator.subscribe();

        let round = orchestrator.run_round(RoundType::Draft).await.unwrap().clone();

        assert_eq!(round.status, RoundStatus::Complete);
        let names: Vec<&str> = round
            .contributions
            .iter()
            .map(|c| c.participant_name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(round.contributions[0].content, "draft A");
        assert!(round.contributions[0].error.is_none());
        assert_eq!(
            round.contributions[1].error.as_deref(),
            Some("Network error: refused")
        );
        assert_eq!(round.contributions[2].content, "half a dra");
        assert!(round.contributions[2].is_error());

        let events = drain(&mut rx);
        let errors = events
            .iter()
            .filter(|e| matches!(e, ForgeEvent::Error { .. }))
            .count();
        assert_eq!(errors, 2);
        let failed_completes = events
            .iter()
            .filter(|e| matches!(e, ForgeEvent::ParticipantComplete { error: Some(_), .. }))
            .count();
        assert_eq!(failed_completes, 2);
        assert!(matches!(
            events.last(),
            Some(ForgeEvent::RoundComplete { errors: 2, contributions: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_panicked_participant_still_completes() {
        let mut orchestrator = orchestrator(vec![
            ("A", MockAdapter::new(Behavior::Reply("alpha"))),
            ("B", MockAdapter::new(Behavior::Panic)),
        ]);
        let mut rx = orchestrator.subscribe();

        let round = orchestrator.run_round(RoundType::Draft).await.unwrap().clone();
        assert_eq!(
            round.contributions[1].error.as_deref(),
            Some("participant task aborted")
        );

        let events = drain(&mut rx);
        let kinds: Vec<&str> = events
            .iter()
            .filter(|e| match e {
                ForgeEvent::ParticipantThinking { participant_id, .. }
                | ForgeEvent::ParticipantComplete { participant_id, .. } => {
                    participant_id.as_str() == "b"
                }
                ForgeEvent::Error { participant_id, .. } => {
                    participant_id.as_ref().is_some_and(|id| id.as_str() == "b")
                }
                _ => false,
            })
            .map(ForgeEvent::kind)
            .collect();
        assert_eq!(
            kinds,
            vec!["participant_thinking", "error", "participant_complete"]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            ForgeEvent::ParticipantComplete { participant_id, error: Some(_), .. }
                if participant_id.as_str() == "b"
        )));
    }

    #[tokio::test]
    async fn test_per_participant_event_order() {
        let mut orchestrator = orchestrator(vec![
            ("A", MockAdapter::new(Behavior::Reply("alpha"))),
            ("B", MockAdapter::new(Behavior::Reply("bravo"))),
        ]);
        let mut rx = orchestrator.subscribe();
        orchestrator.run_round(RoundType::Draft).await.unwrap();

        let events = drain(&mut rx);
        for id in ["a", "b"] {
            let kinds: Vec<&str> = events
                .iter()
                .filter(|e| match e {
                    ForgeEvent::ParticipantThinking { participant_id, .. }
                    | ForgeEvent::ContentDelta { participant_id, .. }
                    | ForgeEvent::ParticipantComplete { participant_id, .. } => {
                        participant_id.as_str() == id
                    }
                    _ => false,
                })
                .map(ForgeEvent::kind)
                .collect();
            assert_eq!(
                kinds,
                vec![
                    "participant_thinking",
                    "content_delta",
                    "content_delta",
                    "participant_complete"
                ]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_contributions_keep_participant_order() {
        let mut orchestrator = orchestrator(vec![
            (
                "Slow",
                MockAdapter::delayed(Behavior::Reply("slow"), Duration::from_secs(5)),
            ),
            ("Fast", MockAdapter::new(Behavior::Reply("fast"))),
        ]);
        let round = orchestrator.run_round(RoundType::Draft).await.unwrap();
        assert_eq!(round.contributions[0].participant_name, "Slow");
        assert_eq!(round.contributions[1].participant_name, "Fast");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_error_contribution() {
        let mut orchestrator = orchestrator(vec![
            ("A", MockAdapter::new(Behavior::Reply("draft"))),
            ("B", MockAdapter::new(Behavior::Hang)),
        ])
        .with_config(
            DeliberationConfig::default().with_round_timeout(Some(Duration::from_secs(5))),
        );

        let round = orchestrator.run_round(RoundType::Draft).await.unwrap();

        assert_eq!(round.status, RoundStatus::Complete);
        assert!(round.contributions[0].error.is_none());
        assert_eq!(round.contributions[1].error.as_deref(), Some("Timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_skips_round() {
        let mut orchestrator = orchestrator(vec![
            ("A", MockAdapter::new(Behavior::Reply("draft"))),
            ("B", MockAdapter::new(Behavior::Hang)),
        ])
        .with_config(DeliberationConfig::default().with_round_timeout(None));
        let token = orchestrator.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let result = orchestrator.run_round(RoundType::Draft).await;
        assert_eq!(result.err(), Some(OrchestratorError::Cancelled));

        let round = orchestrator.session().latest_round().unwrap();
        assert_eq!(round.status, RoundStatus::Skipped);
        assert_eq!(round.contributions[1].error.as_deref(), Some("Cancelled"));

        // A skipped round does not advance the state machine
        let again = orchestrator.run_round(RoundType::Draft).await;
        assert_eq!(again.err(), Some(OrchestratorError::Cancelled));
    }

    #[tokio::test]
    async fn test_fatal_prechecks() {
        let mut empty = Orchestrator::new(Session::new(Goal::new("g").unwrap()));
        assert_eq!(
            empty.run_round(RoundType::Draft).await.err(),
            Some(OrchestratorError::NoParticipants)
        );

        let mut human_only = Orchestrator::new(Session::new(Goal::new("g").unwrap()));
        human_only
            .add_participant(
                Participant::human("Reviewer"),
                MockAdapter::new(Behavior::Reply(AGREE)),
            )
            .unwrap();
        assert_eq!(
            human_only.run_round(RoundType::Draft).await.err(),
            Some(OrchestratorError::NoParticipants)
        );

        let mut orchestrator = orchestrator(vec![("A", MockAdapter::new(Behavior::Reply(AGREE)))]);
        let mut rx = orchestrator.subscribe();
        assert_eq!(
            orchestrator.run_round(RoundType::Critique).await.err(),
            Some(OrchestratorError::InvalidTransition {
                from: "start".to_string(),
                to: RoundType::Critique
            })
        );
        assert!(drain(&mut rx).is_empty());

        orchestrator.run_round(RoundType::Draft).await.unwrap();
        assert_eq!(
            orchestrator.add_participant(
                participant("Late"),
                MockAdapter::new(Behavior::Reply(AGREE))
            ),
            Err(OrchestratorError::SessionStarted)
        );
    }

    #[tokio::test]
    async fn test_refinement_rejected_after_consensus() {
        let mut orchestrator = orchestrator(vec![("A", MockAdapter::new(Behavior::Reply(AGREE)))]);
        for round_type in [
            RoundType::Draft,
            RoundType::Critique,
            RoundType::Synthesis,
            RoundType::Convergence,
        ] {
            orchestrator.run_round(round_type).await.unwrap();
        }
        assert!(!orchestrator.needs_refinement());
        assert!(matches!(
            orchestrator.run_round(RoundType::Refinement).await,
            Err(OrchestratorError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_critique_opinions_are_parsed() {
        let mut orchestrator = orchestrator(vec![
            ("A", MockAdapter::new(Behavior::Reply("Solid. Score: 90/100"))),
            ("B", MockAdapter::new(Behavior::Reply("Weak. Score: 30/100"))),
        ]);
        orchestrator.run_round(RoundType::Draft).await.unwrap();
        let critique = orchestrator.run_round(RoundType::Critique).await.unwrap();

        let stances: Vec<Stance> = critique
            .contributions
            .iter()
            .filter_map(|c| c.opinion.as_ref().map(|o| o.stance))
            .collect();
        assert_eq!(stances, vec![Stance::StronglyAgree, Stance::Disagree]);
        assert_eq!(critique.divergences.len(), 1);
    }
}
