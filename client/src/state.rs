// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::Local;
use common::TaskWithCompletions;

/// What the client is currently showing. The lifecycle is
/// `Loading -> Ready | Error`; any update notification while in `Ready`
/// or `Error` triggers a full re-fetch, whose result feeds back through
/// `from_fetch`. Nothing is ever merged incrementally.
#[derive(Debug)]
pub enum Phase {
    Loading,
    Ready(Vec<TaskWithCompletions>),
    Error(String),
}

impl Phase {
    /// Folds a fetch outcome into the next phase.
    pub fn from_fetch(result: Result<Vec<TaskWithCompletions>, String>) -> Self {
        match result {
            Ok(tasks) => Phase::Ready(tasks),
            Err(message) => Phase::Error(format!("Failed to load tasks: {message}")),
        }
    }
}

/// Renders the current phase as terminal output.
pub fn render(phase: &Phase) -> String {
    match phase {
        Phase::Loading => "Loading tasks...".to_string(),
        Phase::Error(message) => message.clone(),
        Phase::Ready(tasks) if tasks.is_empty() => "No tasks found.".to_string(),
        Phase::Ready(tasks) => {
            let mut lines = vec!["Today's tasks:".to_string()];
            for task in tasks {
                lines.push(render_task(task));
            }
            lines.join("\n")
        }
    }
}

/// One line per task: the most recent completion for today when there is
/// one, otherwise the "mark complete" affordance.
pub fn render_task(task: &TaskWithCompletions) -> String {
    let description = task
        .description
        .as_deref()
        .map(|d| format!(" - {d}"))
        .unwrap_or_default();

    match task.latest_completion() {
        Some(completion) => format!(
            "  [{}] {}{} (completed by {} at {})",
            task.id,
            task.title,
            description,
            completion.completed_by,
            completion
                .completed_at
                .with_timezone(&Local)
                .format("%H:%M"),
        ),
        None => format!(
            "  [{}] {}{} (type: done {} <your name>)",
            task.id, task.title, description, task.id
        ),
    }
}
