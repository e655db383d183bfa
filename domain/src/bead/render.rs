//! Renderers for accepted bead tasks: tracker commands and spec files.

use super::task::BeadTask;

const MAX_SLUG_CHARS: usize = 50;

/// One generated spec file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFile {
    pub filename: String,
    pub content: String,
}

/// One `bd create` command per task, each followed by a `# depends on:`
/// comment when the task has dependencies.
pub fn render_tracker_commands(tasks: &[BeadTask], epic: Option<&str>) -> Vec<String> {
    let mut commands = Vec::with_capacity(tasks.len());
    for task in tasks {
        let mut command = format!(
            "bd create --title={} --type={} --priority={}",
            shell_quote(&task.title),
            task.task_type,
            task.priority.as_u8()
        );
        if let Some(epic) = epic.filter(|e| !e.trim().is_empty()) {
            command.push_str(&format!(" --parent={}", shell_quote(epic.trim())));
        }
        if !task.description.is_empty() {
            command.push_str(&format!(" --description={}", shell_quote(&task.description)));
        }
        commands.push(command);
        if !task.dependencies.is_empty() {
            commands.push(format!("# depends on: {}", task.dependencies.join(", ")));
        }
    }
    commands
}

/// Markdown spec files named `NN-<slug>.md`, numbered from 1 in task order.
pub fn render_spec_files(tasks: &[BeadTask]) -> Vec<SpecFile> {
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let slug = slugify(&task.title);
            let filename = if slug.is_empty() {
                format!("{:02}.md", i + 1)
            } else {
                format!("{:02}-{slug}.md", i + 1)
            };
            SpecFile {
                filename,
                content: render_spec_markdown(task),
            }
        })
        .collect()
}

fn render_spec_markdown(task: &BeadTask) -> String {
    let mut content = format!(
        "# {}\n\n- **Type:** {}\n- **Priority:** {}\n",
        task.title, task.task_type, task.priority
    );
    if !task.dependencies.is_empty() {
        content.push_str("- **Depends on:**\n");
        for dependency in &task.dependencies {
            content.push_str(&format!("  - {dependency}\n"));
        }
    }
    content.push_str("\n## Description\n\n");
    if task.description.is_empty() {
        content.push_str("_No description._\n");
    } else {
        content.push_str(&task.description);
        content.push('\n');
    }
    content
}

/// Lowercase ASCII alphanumeric runs joined by `-`, cut at 50 characters
/// without leaving a trailing dash.
pub fn slugify(title: &str) -> String {
    let slug = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-");
    if slug.len() <= MAX_SLUG_CHARS {
        return slug;
    }
    slug[..MAX_SLUG_CHARS].trim_end_matches('-').to_string()
}

/// Wrap in single quotes for POSIX shells.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
