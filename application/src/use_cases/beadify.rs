//! Beadify use case
//!
//! Decomposes an agreed synthesis into atomic tasks by asking a model for
//! one task at a time until it answers `DONE`.

use crate::config::BeadifierConfig;
use crate::ports::llm_adapter::{AdapterError, LlmAdapter};
use std::sync::Arc;
use thinktank_domain::{
    BeadPromptTemplate, BeadReply, BeadTask, CompletionRequest, ValidationIssue, parse_bead_reply,
    validate_task,
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BeadifyError {
    #[error("Nothing to beadify: the synthesis is empty")]
    EmptySynthesis,

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

/// Why extraction stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model replied `DONE`.
    Done,
    /// A reply was neither a task nor `DONE`.
    ParseFailure,
    /// The request budget ran out.
    MaxTasks,
}

/// A candidate dropped for failing validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTask {
    pub task: BeadTask,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeadifyOutcome {
    /// Accepted tasks in extraction order
    pub tasks: Vec<BeadTask>,
    pub rejected: Vec<RejectedTask>,
    pub stop_reason: StopReason,
}

/// Use case for extracting atomic tasks from a synthesis
pub struct Beadifier {
    adapter: Arc<dyn LlmAdapter>,
    config: BeadifierConfig,
}

impl Beadifier {
    pub fn new(adapter: Arc<dyn LlmAdapter>) -> Self {
        Self {
            adapter,
            config: BeadifierConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BeadifierConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn beadify(&self, synthesis: &str) -> Result<BeadifyOutcome, BeadifyError> {
        let synthesis = synthesis.trim();
        if synthesis.is_empty() {
            return Err(BeadifyError::EmptySynthesis);
        }

        info!(
            "Beadifying synthesis with {} (max {} requests)",
            self.adapter.model(),
            self.config.max_tasks
        );

        let mut tasks: Vec<BeadTask> = Vec::new();
        let mut rejected = Vec::new();

        for attempt in 1..=self.config.max_tasks {
            let titles: Vec<String> = tasks.iter().map(|t| t.title.clone()).collect();
            let request = CompletionRequest::new(self.adapter.model())
                .with_system(BeadPromptTemplate::system())
                .with_user(BeadPromptTemplate::next_task(
                    synthesis,
                    tasks.len() + 1,
                    &titles,
                ))
                .with_temperature(self.config.temperature)
                .with_max_tokens(self.config.max_tokens);

            let completion = self.adapter.complete(&request).await?;

            match parse_bead_reply(&completion.content) {
                BeadReply::Done => {
                    info!("Beadifier done after {} requests: {} tasks", attempt, tasks.len());
                    return Ok(BeadifyOutcome {
                        tasks,
                        rejected,
                        stop_reason: StopReason::Done,
                    });
                }
                BeadReply::Unparseable(reply) => {
                    warn!("Beadifier reply could not be parsed: {}", reply);
                    return Ok(BeadifyOutcome {
                        tasks,
                        rejected,
                        stop_reason: StopReason::ParseFailure,
                    });
                }
                BeadReply::Task(task) => {
                    let issues = validate_task(&task);
                    if issues.is_empty() {
                        debug!("Accepted task #{}: {}", tasks.len() + 1, task.title);
                        tasks.push(task);
                    } else {
                        warn!(
                            "Rejected task '{}': {}",
                            task.title,
                            issues
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join("; ")
                        );
                        rejected.push(RejectedTask { task, issues });
                    }
                }
            }
        }

        warn!(
            "Beadifier stopped at the request limit ({}) with {} tasks",
            self.config.max_tasks,
            tasks.len()
        );
        Ok(BeadifyOutcome {
            tasks,
            rejected,
            stop_reason: StopReason::MaxTasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_adapter::StreamHandle;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use thinktank_domain::{BeadType, Priority, StreamChunk};

    /// Replies from a fixed script, recording every prompt it receives.
    struct ScriptedAdapter {
        replies: Mutex<VecDeque<Result<String, AdapterError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedAdapter {
        fn new(replies: Vec<Result<&str, AdapterError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(String::from))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmAdapter for ScriptedAdapter {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }

        async fn complete_stream(
            &self,
            request: &CompletionRequest,
        ) -> Result<StreamHandle, AdapterError> {
            let prompt = request
                .conversation()
                .map(|m| m.content.clone())
                .collect::<Vec<_>>()
                .join("\n");
            self.prompts.lock().unwrap().push(prompt);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("DONE".to_string()))?;
            Ok(StreamHandle::from_chunks(vec![
                Ok(StreamChunk::delta(reply)),
                Ok(StreamChunk::complete(Some("stop".to_string()))),
            ]))
        }
    }

    const SYNTHESIS: &str = "Build a login service backed by Postgres with JWT sessions.";

    #[tokio::test]
    async fn test_three_tasks_then_done() {
        let adapter = ScriptedAdapter::new(vec![
            Ok(r#"{"title": "Create users table", "description": "Postgres migration.", "priority": "P1", "type": "feature"}"#),
            Ok(r#"{"title": "Add login endpoint", "description": "POST /login.", "priority": "P1", "type": "feature", "depends_on": ["Create users table"]}"#),
            Ok(r#"{"title": "Issue JWT on login", "description": "Sign tokens.", "priority": "P2", "type": "task", "depends_on": ["Add login endpoint"]}"#),
            Ok("DONE"),
        ]);
        let beadifier = Beadifier::new(adapter.clone());

        let outcome = beadifier.beadify(SYNTHESIS).await.unwrap();

        assert_eq!(outcome.stop_reason, StopReason::Done);
        assert_eq!(outcome.tasks.len(), 3);
        assert!(outcome.rejected.is_empty());
        assert_eq!(adapter.calls(), 4);
        assert_eq!(outcome.tasks[0].priority, Priority::P1);
        assert_eq!(outcome.tasks[1].task_type, BeadType::Feature);
        assert_eq!(outcome.tasks[2].dependencies, vec!["Add login endpoint"]);
        for task in &outcome.tasks {
            assert!(validate_task(task).is_empty());
        }

        let prompts = adapter.prompts.lock().unwrap();
        assert!(prompts[0].contains("atomic task #1"));
        assert!(prompts[3].contains("atomic task #4"));
        assert!(prompts[3].contains("3. Issue JWT on login"));
    }

    #[tokio::test]
    async fn test_invalid_candidates_are_dropped_not_retried() {
        let adapter = ScriptedAdapter::new(vec![
            Ok(r#"{"title": "Create table and seed data", "description": ""}"#),
            Ok(r#"{"title": "Create users table", "description": ""}"#),
            Ok("DONE"),
        ]);
        let outcome = Beadifier::new(adapter.clone())
            .beadify(SYNTHESIS)
            .await
            .unwrap();

        assert_eq!(outcome.tasks.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(
            outcome.rejected[0].issues,
            vec![ValidationIssue::CompoundTitle(" and ")]
        );
        assert_eq!(adapter.calls(), 3);
    }

    #[tokio::test]
    async fn test_parse_failure_stops() {
        let adapter = ScriptedAdapter::new(vec![Ok("I'd rather chat about it.")]);
        let outcome = Beadifier::new(adapter).beadify(SYNTHESIS).await.unwrap();
        assert_eq!(outcome.stop_reason, StopReason::ParseFailure);
        assert!(outcome.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_request_budget_is_bounded() {
        let task = r#"{"title": "Write a test", "description": ""}"#;
        let adapter = ScriptedAdapter::new(vec![Ok(task); 10]);
        let outcome = Beadifier::new(adapter.clone())
            .with_config(BeadifierConfig::default().with_max_tasks(4))
            .beadify(SYNTHESIS)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, StopReason::MaxTasks);
        assert_eq!(outcome.tasks.len(), 4);
        assert_eq!(adapter.calls(), 4);
    }

    #[tokio::test]
    async fn test_adapter_error_propagates() {
        let adapter = ScriptedAdapter::new(vec![Err(AdapterError::RateLimited("slow down".into()))]);
        let result = Beadifier::new(adapter).beadify(SYNTHESIS).await;
        assert_eq!(
            result,
            Err(BeadifyError::Adapter(AdapterError::RateLimited("slow down".into())))
        );
    }

    #[tokio::test]
    async fn test_empty_synthesis() {
        let adapter = ScriptedAdapter::new(vec![]);
        let result = Beadifier::new(adapter.clone()).beadify("   ").await;
        assert_eq!(result, Err(BeadifyError::EmptySynthesis));
        assert_eq!(adapter.calls(), 0);
    }
}
