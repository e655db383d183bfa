//! Opinions and their extraction from free-form model replies.
//!
//! Replies are parsed in order of decreasing structure:
//!
//! | Format | Example |
//! |--------|---------|
//! | JSON object | `{"stance": "agree", "reasoning": "...", "concerns": []}` |
//! | Vote block | `VOTE: DISAGREE` / `REASONING: ...` / `CONCERNS:` + `- ...` bullets |
//! | Bare keywords | `I agree with the synthesis.` |
//!
//! Critique replies additionally accept a 1-100 score ([`parse_critique_opinion`]).
//! Text that matches none of these yields `None`: an opinion is never guessed.

use serde::{Deserialize, Serialize};

/// Position a participant takes on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    StronglyAgree,
    Agree,
    Partial,
    Disagree,
    StronglyDisagree,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::StronglyAgree => "strongly_agree",
            Stance::Agree => "agree",
            Stance::Partial => "partial",
            Stance::Disagree => "disagree",
            Stance::StronglyDisagree => "strongly_disagree",
        }
    }

    pub fn is_agreeing(&self) -> bool {
        matches!(self, Stance::StronglyAgree | Stance::Agree)
    }

    pub fn is_disagreeing(&self) -> bool {
        matches!(self, Stance::Disagree | Stance::StronglyDisagree)
    }

    /// Strength assumed when the reply does not state one.
    pub fn default_strength(&self) -> f64 {
        match self {
            Stance::StronglyAgree | Stance::StronglyDisagree => 1.0,
            Stance::Agree | Stance::Disagree => 0.75,
            Stance::Partial => 0.5,
        }
    }

    /// Map a 1-100 critique score onto a stance.
    pub fn from_score(score: u32) -> Self {
        match score {
            85.. => Stance::StronglyAgree,
            65..=84 => Stance::Agree,
            45..=64 => Stance::Partial,
            25..=44 => Stance::Disagree,
            _ => Stance::StronglyDisagree,
        }
    }

    /// Find the first stance keyword in `text`.
    ///
    /// Multi-word and negative forms are checked before their substrings so
    /// that "strongly disagree" never reads as "agree". A negated "agree"
    /// ("do not agree", "can't agree", "NOT AGREE") is a disagreement.
    pub fn find_in(text: &str) -> Option<Self> {
        let normalized: String = text
            .chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    ' '
                }
            })
            .collect();
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let has = |word: &str| tokens.contains(&word);
        let has_pair = |first: &str, second: &str| {
            tokens
                .windows(2)
                .any(|pair| pair[0] == first && pair[1] == second)
        };
        // Apostrophes split contractions, so "don't" arrives as DON, T.
        let negated_at = |i: usize| {
            let back = |n: usize| i.checked_sub(n).map(|j| tokens[j]);
            matches!(
                back(1),
                Some("NOT" | "NEVER" | "NO" | "CANNOT" | "DONT" | "CANT" | "WONT")
            ) || (back(1) == Some("T")
                && matches!(
                    back(2),
                    Some("DON" | "CAN" | "WON" | "DOESN" | "DIDN" | "COULDN")
                ))
        };
        let negated_agree = tokens.iter().enumerate().any(|(i, token)| {
            *token == "AGREE"
                && (negated_at(i)
                    || (i > 0
                        && matches!(tokens[i - 1], "STRONGLY" | "FULLY" | "REALLY")
                        && negated_at(i - 1)))
        });

        if has_pair("STRONGLY", "DISAGREE") {
            Some(Stance::StronglyDisagree)
        } else if negated_agree {
            Some(Stance::Disagree)
        } else if has_pair("STRONGLY", "AGREE") {
            Some(Stance::StronglyAgree)
        } else if has("DISAGREE") {
            Some(Stance::Disagree)
        } else if has("PARTIAL") || has("PARTIALLY") {
            Some(Stance::Partial)
        } else if has("AGREE") {
            Some(Stance::Agree)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A participant's parsed position on a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
    pub stance: Stance,
    pub reasoning: String,
    pub concerns: Vec<String>,
    /// Confidence in the stance, 0.0 to 1.0
    pub strength: f64,
}

impl Opinion {
    pub fn new(stance: Stance, reasoning: impl Into<String>) -> Self {
        Self {
            stance,
            reasoning: reasoning.into(),
            concerns: Vec::new(),
            strength: stance.default_strength(),
        }
    }

    pub fn with_concerns(mut self, concerns: Vec<String>) -> Self {
        self.concerns = concerns;
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength.clamp(0.0, 1.0);
        self
    }
}

/// Parse an opinion from a convergence (or any voting) reply.
pub fn parse_opinion(text: &str) -> Option<Opinion> {
    parse_json_opinion(text)
        .or_else(|| parse_vote_block(text))
        .or_else(|| parse_keywords(text))
}

/// Parse an opinion from a critique reply.
///
/// A 1-100 score takes precedence over keywords because critiques discuss
/// agreement with individual points and a stray "agree" says little about
/// the overall verdict.
pub fn parse_critique_opinion(text: &str) -> Option<Opinion> {
    if let Some(opinion) = parse_json_opinion(text) {
        return Some(opinion);
    }
    if let Some(score) = extract_score(text) {
        let stance = Stance::from_score(score);
        return Some(
            Opinion::new(stance, text.trim())
                .with_concerns(extract_concerns(text))
                .with_strength(f64::from(score) / 100.0),
        );
    }
    parse_vote_block(text).or_else(|| parse_keywords(text))
}

fn parse_json_opinion(text: &str) -> Option<Opinion> {
    let start = text.find('{')?;
    let end = text[start..].rfind('}')?;
    let value: serde_json::Value = serde_json::from_str(&text[start..start + end + 1]).ok()?;

    let reasoning = value
        .get("reasoning")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let stance_and_score = value
        .get("stance")
        .or_else(|| value.get("vote"))
        .and_then(|v| v.as_str())
        .and_then(Stance::find_in)
        .map(|stance| (stance, None))
        .or_else(|| {
            value
                .get("score")
                .and_then(|v| v.as_f64())
                .map(|score| score.clamp(1.0, 100.0) as u32)
                .map(|score| (Stance::from_score(score), Some(score)))
        });
    let (stance, score) = stance_and_score?;

    let concerns = value
        .get("concerns")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let strength = value
        .get("strength")
        .and_then(|v| v.as_f64())
        .or_else(|| score.map(|s| f64::from(s) / 100.0))
        .unwrap_or_else(|| stance.default_strength());

    Some(
        Opinion::new(stance, reasoning)
            .with_concerns(concerns)
            .with_strength(strength),
    )
}

#[derive(PartialEq)]
enum Section {
    None,
    Reasoning,
    Concerns,
}

fn parse_vote_block(text: &str) -> Option<Opinion> {
    let mut stance = None;
    let mut reasoning = Vec::new();
    let mut concerns = Vec::new();
    let mut section = Section::None;

    for line in text.lines() {
        let trimmed = line.trim().trim_start_matches(['*', '#']).trim();
        if let Some(rest) = strip_label(trimmed, "VOTE:") {
            stance = Stance::find_in(rest);
            section = Section::None;
        } else if let Some(rest) = strip_label(trimmed, "REASONING:") {
            if !rest.is_empty() {
                reasoning.push(rest.to_string());
            }
            section = Section::Reasoning;
        } else if let Some(rest) = strip_label(trimmed, "CONCERNS:") {
            push_concern(&mut concerns, rest);
            section = Section::Concerns;
        } else if section == Section::Reasoning && !trimmed.is_empty() {
            reasoning.push(trimmed.to_string());
        } else if section == Section::Concerns {
            push_concern(&mut concerns, trimmed);
        }
    }

    let stance = stance?;
    Some(Opinion::new(stance, reasoning.join(" ")).with_concerns(concerns))
}

fn parse_keywords(text: &str) -> Option<Opinion> {
    let stance = Stance::find_in(text)?;
    Some(Opinion::new(stance, text.trim()).with_concerns(extract_concerns(text)))
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if head.eq_ignore_ascii_case(label) {
        Some(line[label.len()..].trim().trim_start_matches('*').trim())
    } else {
        None
    }
}

fn push_concern(concerns: &mut Vec<String>, line: &str) {
    let item = line
        .trim()
        .trim_start_matches(['-', '*', '•'])
        .trim();
    let lowered = item.to_lowercase();
    if item.is_empty() || lowered == "none" || lowered == "none." || lowered == "n/a" {
        return;
    }
    concerns.push(item.to_string());
}

/// Concerns listed under a `CONCERNS:` header anywhere in the text.
fn extract_concerns(text: &str) -> Vec<String> {
    let mut concerns = Vec::new();
    let mut in_concerns = false;
    for line in text.lines() {
        let trimmed = line.trim().trim_start_matches(['*', '#']).trim();
        if let Some(rest) = strip_label(trimmed, "CONCERNS:") {
            push_concern(&mut concerns, rest);
            in_concerns = true;
        } else if in_concerns {
            if trimmed.starts_with(['-', '*', '•']) {
                push_concern(&mut concerns, trimmed);
            } else if !trimmed.is_empty() {
                in_concerns = false;
            }
        }
    }
    concerns
}

/// Find a `N/100` or `score: N` pattern with `N` in 1..=100.
fn extract_score(text: &str) -> Option<u32> {
    let in_range = |n: u32| (1..=100).contains(&n).then_some(n);

    for word in text.split_whitespace() {
        if let Some(num) = word
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .trim_end_matches(|c: char| !c.is_ascii_digit())
            .strip_suffix("/100")
            .and_then(|n| n.parse::<u32>().ok())
            .and_then(in_range)
        {
            return Some(num);
        }
    }

    let lowered = text.to_lowercase();
    let mut search_from = 0;
    while let Some(pos) = lowered[search_from..].find("score") {
        let after = search_from + pos + "score".len();
        let number: String = lowered[after..]
            .trim_start_matches(|c: char| c == ':' || c == '*' || c.is_whitespace())
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Some(num) = number.parse::<u32>().ok().and_then(in_range) {
            return Some(num);
        }
        search_from = after;
    }
    None
}
