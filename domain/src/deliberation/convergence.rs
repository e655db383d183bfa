//! Convergence scoring over the latest convergence round.

use super::round::{Round, RoundType};
use serde::{Deserialize, Serialize};

/// Concern reported when there is nothing to score.
pub const NO_CONVERGENCE_ROUND: &str = "No convergence round has been run";
/// Concern reported when a convergence round produced no parsable votes.
pub const NO_VOTES: &str = "No participant cast a parsable vote in the convergence round";

/// Quantified agreement on the current synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceScore {
    /// `(agree + 0.5 * partial) / total`, in `[0, 1]`
    pub score: f64,
    pub agreement_count: usize,
    pub disagreement_count: usize,
    pub partial_count: usize,
    pub is_converged: bool,
    /// `"{participant}: {concern}"` for every disagree-leaning vote
    pub blocking_concerns: Vec<String>,
}

impl ConvergenceScore {
    fn unconverged(concern: &str) -> Self {
        Self {
            score: 0.0,
            agreement_count: 0,
            disagreement_count: 0,
            partial_count: 0,
            is_converged: false,
            blocking_concerns: vec![concern.to_string()],
        }
    }

    pub fn total_votes(&self) -> usize {
        self.agreement_count + self.disagreement_count + self.partial_count
    }
}

/// Score convergence using the most recent Convergence round in `rounds`.
///
/// Converged means the score reaches `threshold` with no disagreeing vote.
/// Rounds that are not Convergence rounds are ignored.
pub fn calculate_convergence(rounds: &[Round], threshold: f64) -> ConvergenceScore {
    let Some(round) = rounds
        .iter()
        .rev()
        .find(|r| r.round_type == RoundType::Convergence)
    else {
        return ConvergenceScore::unconverged(NO_CONVERGENCE_ROUND);
    };

    let mut agreement_count = 0;
    let mut disagreement_count = 0;
    let mut partial_count = 0;
    let mut blocking_concerns = Vec::new();

    for (contribution, opinion) in round.opinions() {
        if opinion.stance.is_agreeing() {
            agreement_count += 1;
        } else if opinion.stance.is_disagreeing() {
            disagreement_count += 1;
            let name = &contribution.participant_name;
            if opinion.concerns.is_empty() {
                let reasoning = crate::core::string::single_line(opinion.reasoning.trim());
                let reasoning = if reasoning.is_empty() {
                    "disagreed without stating a reason".to_string()
                } else {
                    reasoning
                };
                blocking_concerns.push(format!("{name}: {reasoning}"));
            } else {
                blocking_concerns.extend(
                    opinion
                        .concerns
                        .iter()
                        .map(|concern| format!("{name}: {concern}")),
                );
            }
        } else {
            partial_count += 1;
        }
    }

    let total = agreement_count + disagreement_count + partial_count;
    if total == 0 {
        return ConvergenceScore::unconverged(NO_VOTES);
    }

    let score = (agreement_count as f64 + 0.5 * partial_count as f64) / total as f64;
    let score = score.clamp(0.0, 1.0);

    ConvergenceScore {
        score,
        agreement_count,
        disagreement_count,
        partial_count,
        is_converged: score >= threshold && disagreement_count == 0,
        blocking_concerns,
    }
}
