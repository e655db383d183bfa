//! Prompt templates for each deliberation round and for the beadifier.

use crate::participant::entities::Participant;

const SEPARATOR: &str = "\n\n---\n\n";

/// Templates for generating round prompts
pub struct RoundPromptTemplate;

impl RoundPromptTemplate {
    /// System prompt for a participant: base instructions, role descriptor,
    /// then the participant's own system prompt.
    pub fn system(participant: &Participant) -> String {
        let mut prompt = format!(
            "You are {}, one member of a think tank deliberating on a goal with other experts.\n\
             Argue from your own perspective, be concrete and concise, and change your mind when the evidence warrants it.",
            participant.name
        );
        if let Some(role) = &participant.role {
            prompt.push_str("\n\n");
            prompt.push_str(&role.descriptor());
        }
        if !participant.system_prompt.trim().is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(participant.system_prompt.trim());
        }
        prompt
    }

    /// Draft round: an independent proposal.
    pub fn draft(participant: &str, goal: &str) -> String {
        format!(
            r#"You are {participant}.

Goal: {goal}

Propose a solution. Cover:
1. Key components
2. Implementation considerations
3. Challenges and how to address them"#
        )
    }

    /// Critique round: review every draft.
    pub fn critique(participant: &str, goal: &str, drafts: &[(String, String)]) -> String {
        format!(
            r#"You are {participant}.

Goal: {goal}

Review these proposals:

{}

For the proposals as a whole, identify:
1. Strengths
2. Weaknesses
3. Gaps
4. Suggestions

Finish with an overall score as `Score: N/100` (1 = unusable, 100 = ready to build)."#,
            join_contributions(drafts)
        )
    }

    /// Response round: answer the critiques of your own proposal.
    pub fn response(participant: &str, goal: &str, critiques: &[(String, String)]) -> String {
        format!(
            r#"You are {participant}.

Goal: {goal}

Your proposal received these critiques:

{}

Respond to them: concede valid points, defend what still holds, and state how you would amend your proposal."#,
            join_contributions(critiques)
        )
    }

    /// Synthesis round: merge the best of the previous round.
    pub fn synthesis(participant: &str, goal: &str, inputs: &[(String, String)]) -> String {
        format!(
            r#"You are {participant}.

Goal: {goal}

Input from the previous round:

{}

Combine the best elements from the critiques into one coherent, internally consistent proposal.
Resolve conflicts explicitly rather than listing alternatives."#,
            join_contributions(inputs)
        )
    }

    /// Convergence round: vote on the synthesis.
    pub fn convergence(participant: &str, goal: &str, synthesis: &str) -> String {
        format!(
            r#"You are {participant}.

Goal: {goal}

Proposed synthesis:

{synthesis}

Vote AGREE or DISAGREE on this synthesis. Reply exactly in this format:

VOTE: AGREE | DISAGREE
REASONING: <one paragraph>
CONCERNS:
- <each remaining concern on its own line, or "none">"#
        )
    }

    /// Refinement round: address the blocking concerns.
    pub fn refinement(participant: &str, goal: &str, synthesis: &str, concerns: &[String]) -> String {
        let concerns = if concerns.is_empty() {
            "- (none recorded)".to_string()
        } else {
            concerns
                .iter()
                .map(|c| format!("- {c}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!(
            r#"You are {participant}.

Goal: {goal}

Current synthesis:

{synthesis}

These concerns blocked consensus:

{concerns}

Revise the synthesis so that it addresses every concern. Keep what already works."#
        )
    }
}

/// Templates for the beadifier's task extraction dialogue
pub struct BeadPromptTemplate;

impl BeadPromptTemplate {
    pub fn system() -> &'static str {
        r#"You decompose an agreed design into atomic implementation tasks.
An atomic task has exactly one outcome, fits in a title of at most 80 characters and a description of at most 200 characters, and never combines steps with "and", "then", "also" or "plus".
Reply with a single JSON object and nothing else."#
    }

    /// Ask for task number `n`, listing the titles accepted so far.
    pub fn next_task(synthesis: &str, n: usize, accepted: &[String]) -> String {
        let accepted = if accepted.is_empty() {
            "(none yet)".to_string()
        } else {
            accepted
                .iter()
                .enumerate()
                .map(|(i, title)| format!("{}. {title}", i + 1))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!(
            r#"Agreed design:

{synthesis}

Tasks accepted so far:
{accepted}

Give atomic task #{n} as:
{{"title": "...", "description": "...", "priority": "P0".."P4", "type": "task" | "bug" | "feature" | "docs", "depends_on": ["<title of an earlier task>", ...]}}

If every part of the design is already covered, reply with exactly: DONE"#
        )
    }
}

fn join_contributions(contributions: &[(String, String)]) -> String {
    contributions
        .iter()
        .map(|(name, content)| format!("### {name}\n\n{}", content.trim()))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
