//! Console output for deliberation progress and results

use colored::Colorize;
use thinktank_application::{BeadifyOutcome, DeliberationOutcome, ForgeEvent};
use thinktank_domain::{BeadTask, Session};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Prints progress events as they arrive.
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// One console line for an event, or `None` for events that are not shown.
    pub fn format_event(event: &ForgeEvent) -> Option<String> {
        match event {
            ForgeEvent::RoundStarted {
                round_number,
                round_type,
                ..
            } => Some(format!(
                "\n{}",
                format!("== Round {round_number}: {round_type} ==").cyan().bold()
            )),
            ForgeEvent::ParticipantThinking {
                participant_name, ..
            } => Some(format!("  {} thinking...", participant_name).dimmed().to_string()),
            ForgeEvent::ContentDelta { .. } | ForgeEvent::DeliberationFinished { .. } => None,
            ForgeEvent::ParticipantComplete {
                participant_name,
                usage,
                error: None,
                ..
            } => Some(format!(
                "  {} {} ({} tokens)",
                "v".green(),
                participant_name,
                usage.total()
            )),
            ForgeEvent::ParticipantComplete {
                participant_name,
                error: Some(error),
                ..
            } => Some(format!("  {} {}: {}", "x".red(), participant_name, error)),
            ForgeEvent::RoundComplete {
                round_number,
                contributions,
                errors,
                divergences,
                ..
            } => Some(format!(
                "  Round {round_number} complete: {contributions} contributions, {errors} failed, {divergences} divergences"
            )),
            ForgeEvent::ConvergenceEvaluated { score, .. } => Some(format!(
                "  {} {:.0}% ({} agree, {} partial, {} disagree)",
                "Convergence:".yellow().bold(),
                score.score * 100.0,
                score.agreement_count,
                score.partial_count,
                score.disagreement_count
            )),
            ForgeEvent::Error { message, .. } => {
                Some(format!("  {} {}", "!".red().bold(), message))
            }
        }
    }

    /// Print events until the channel closes.
    pub fn spawn(mut events: broadcast::Receiver<ForgeEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Some(line) = Self::format_event(&event) {
                            println!("{}", line);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        println!("  ({} progress events skipped)", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

pub fn header(goal: &str, participants: &[String]) -> String {
    format!(
        "{}\n{}\n\n{} {}\n{} {}\n",
        "+============================================================+",
        "|                       thinktank                            |",
        "Goal:".cyan().bold(),
        goal,
        "Participants:".cyan().bold(),
        participants.join(", ")
    )
}

/// Verdict, blocking concerns and final synthesis.
pub fn format_verdict(outcome: &DeliberationOutcome, session: &Session) -> String {
    let mut output = String::new();
    let percent = outcome.score.score * 100.0;

    if outcome.converged {
        output.push_str(&format!(
            "\n{}\n",
            format!(
                "Consensus reached after {} rounds ({:.0}%)",
                outcome.rounds_run, percent
            )
            .green()
            .bold()
        ));
    } else {
        output.push_str(&format!(
            "\n{}\n",
            format!(
                "No consensus after {} rounds and {} refinements ({:.0}%)",
                outcome.rounds_run, outcome.refinements, percent
            )
            .red()
            .bold()
        ));
        if !outcome.score.blocking_concerns.is_empty() {
            output.push_str(&format!("\n{}\n", "Blocking concerns:".yellow().bold()));
            for concern in &outcome.score.blocking_concerns {
                output.push_str(&format!("  * {}\n", concern));
            }
        }
    }

    if let Some(synthesis) = session.latest_synthesis() {
        output.push_str(&format!(
            "\n{}\n\n{}\n",
            format!("Final synthesis ({})", synthesis.participant_name)
                .cyan()
                .bold(),
            synthesis.content.trim()
        ));
    }
    output
}

/// Accepted tasks as tracker commands, followed by any rejected candidates.
pub fn format_beads(outcome: &BeadifyOutcome, commands: &[String]) -> String {
    let mut output = format!(
        "\n{}\n",
        format!("Tasks ({}, stopped: {:?})", outcome.tasks.len(), outcome.stop_reason)
            .cyan()
            .bold()
    );
    for command in commands {
        output.push_str(command);
        output.push('\n');
    }
    if !outcome.rejected.is_empty() {
        output.push_str(&format!("\n{}\n", "Rejected candidates:".yellow().bold()));
        for rejected in &outcome.rejected {
            output.push_str(&format!(
                "  * {}: {}\n",
                task_label(&rejected.task),
                rejected
                    .issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            ));
        }
    }
    output
}

fn task_label(task: &BeadTask) -> &str {
    if task.title.trim().is_empty() {
        "(untitled)"
    } else {
        &task.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thinktank_application::{RejectedTask, StopReason};
    use thinktank_domain::{
        ConvergenceScore, Goal, ParticipantId, RoundType, TokenUsage, ValidationIssue,
    };

    fn score(score: f64, converged: bool, concerns: Vec<&str>) -> ConvergenceScore {
        ConvergenceScore {
            score,
            agreement_count: 2,
            disagreement_count: usize::from(!converged),
            partial_count: 0,
            is_converged: converged,
            blocking_concerns: concerns.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_round_started_line() {
        let line = ConsoleReporter::format_event(&ForgeEvent::RoundStarted {
            session_id: thinktank_domain::SessionId::generate(),
            round_number: 2,
            round_type: RoundType::Critique,
        })
        .unwrap();
        assert!(line.contains("Round 2: critique"));
    }

    #[test]
    fn test_failed_participant_shows_error() {
        let line = ConsoleReporter::format_event(&ForgeEvent::ParticipantComplete {
            round_number: 1,
            participant_id: ParticipantId::new("a"),
            participant_name: "Ada".to_string(),
            content: String::new(),
            usage: TokenUsage::default(),
            error: Some("Request timed out".to_string()),
        })
        .unwrap();
        assert!(line.contains("Ada"));
        assert!(line.contains("Request timed out"));
    }

    #[test]
    fn test_deltas_are_not_printed() {
        assert!(ConsoleReporter::format_event(&ForgeEvent::ContentDelta {
            round_number: 1,
            participant_id: ParticipantId::new("a"),
            delta: "tok".to_string(),
        })
        .is_none());
    }

    #[test]
    fn test_verdict_lists_blocking_concerns() {
        let session = Session::new(Goal::new("goal").unwrap());
        let outcome = DeliberationOutcome {
            converged: false,
            score: score(2.0 / 3.0, false, vec!["C: no auth"]),
            rounds_run: 4,
            refinements: 0,
        };
        let verdict = format_verdict(&outcome, &session);
        assert!(verdict.contains("No consensus after 4 rounds"));
        assert!(verdict.contains("67%"));
        assert!(verdict.contains("C: no auth"));
    }

    #[test]
    fn test_beads_lists_rejected_candidates() {
        let outcome = BeadifyOutcome {
            tasks: vec![],
            rejected: vec![RejectedTask {
                task: BeadTask::new("", ""),
                issues: vec![ValidationIssue::EmptyTitle],
            }],
            stop_reason: StopReason::Done,
        };
        let text = format_beads(&outcome, &[]);
        assert!(text.contains("Tasks (0, stopped: Done)"));
        assert!(text.contains("(untitled)"));
    }
}
