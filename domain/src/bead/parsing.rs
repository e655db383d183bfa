//! Parsing of beadifier replies.
//!
//! A reply is either one task (JSON object preferred, `TITLE:`-style lines
//! accepted) or the `DONE` sentinel. Anything else is unparseable.

use super::task::{BeadTask, BeadType, Priority};

/// Outcome of parsing one beadifier reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeadReply {
    Task(BeadTask),
    Done,
    Unparseable(String),
}

pub fn parse_bead_reply(text: &str) -> BeadReply {
    if is_done(text) {
        return BeadReply::Done;
    }
    if let Some(reply) = parse_json_reply(text) {
        return reply;
    }
    if let Some(task) = parse_line_reply(text) {
        return BeadReply::Task(task);
    }
    BeadReply::Unparseable(crate::core::string::truncate(text.trim(), 200))
}

fn is_done(text: &str) -> bool {
    let stripped = text
        .trim()
        .trim_matches(|c: char| c == '`' || c == '*' || c == '.' || c == '"' || c.is_whitespace());
    stripped.eq_ignore_ascii_case("done")
}

fn parse_json_reply(text: &str) -> Option<BeadReply> {
    let start = text.find('{')?;
    let end = text[start..].rfind('}')?;
    let value: serde_json::Value = serde_json::from_str(&text[start..start + end + 1]).ok()?;

    if value.get("done").and_then(|v| v.as_bool()) == Some(true) {
        return Some(BeadReply::Done);
    }

    let title = value.get("title")?.as_str()?.trim().to_string();
    if title.is_empty() {
        return None;
    }
    let description = value
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string();

    let priority = match value.get("priority") {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(Priority::from_u8),
        _ => None,
    }
    .unwrap_or_default();

    let task_type = value
        .get("type")
        .or_else(|| value.get("task_type"))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<BeadType>().ok())
        .unwrap_or_default();

    let dependencies = value
        .get("depends_on")
        .or_else(|| value.get("dependencies"))
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

    Some(BeadReply::Task(
        BeadTask::new(title, description)
            .with_priority(priority)
            .with_type(task_type)
            .with_dependencies(dependencies),
    ))
}

fn parse_line_reply(text: &str) -> Option<BeadTask> {
    let mut title = None;
    let mut description = String::new();
    let mut priority = Priority::default();
    let mut task_type = BeadType::default();
    let mut dependencies = Vec::new();

    for line in text.lines() {
        let line = line.trim().trim_start_matches(['-', '*']).trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches('*').trim();
        match key.trim().trim_matches('*').to_lowercase().as_str() {
            "title" if !value.is_empty() => title = Some(value.to_string()),
            "description" => description = value.to_string(),
            "priority" => priority = value.parse().unwrap_or_default(),
            "type" => task_type = value.parse().unwrap_or_default(),
            "depends on" | "depends_on" | "dependencies" => {
                dependencies = value
                    .split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("none"))
                    .map(String::from)
                    .collect();
            }
            _ => {}
        }
    }

    Some(
        BeadTask::new(title?, description)
            .with_priority(priority)
            .with_type(task_type)
            .with_dependencies(dependencies),
    )
}
