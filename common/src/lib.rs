// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A household task as stored in the database.
///
/// Derivation attributes (derive):
/// - `Serialize`, `Deserialize`: Allows conversion to/from JSON.
/// - `Debug`: Enables displaying the structure for debugging.
/// - `Clone`: Allows creating copies of the object.
/// - `sqlx::FromRow`: Allows `sqlx` to create a `Task` instance directly
///   from a database result row.
///
/// JSON field names are camelCase to match the HTTP API, while the
/// database columns stay snake_case.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[sqlx(rename = "id")]
    pub id: i64,

    #[sqlx(rename = "title")]
    pub title: String,

    #[sqlx(rename = "description")]
    pub description: Option<String>,

    // Archived tasks are never listed and can no longer be completed.
    #[sqlx(rename = "archived")]
    pub archived: bool,

    #[sqlx(rename = "created_at")]
    pub created_at: DateTime<Utc>,
}

/// A record that a specific person finished a specific task at a
/// specific time. The timestamp is always assigned server-side.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    #[sqlx(rename = "id")]
    pub id: i64,

    #[sqlx(rename = "task_id")]
    pub task_id: i64,

    #[sqlx(rename = "completed_by")]
    pub completed_by: String,

    #[sqlx(rename = "completed_at")]
    pub completed_at: DateTime<Utc>,
}

/// A task together with its completions for the current day, completions
/// ordered most recent first. This is the shape `GET /api/tasks/today`
/// returns; it is never stored as-is.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithCompletions {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub completions: Vec<Completion>,
}

impl TaskWithCompletions {
    pub fn new(task: Task, completions: Vec<Completion>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            archived: task.archived,
            created_at: task.created_at,
            completions,
        }
    }

    /// The most recent completion for today, if any. Relies on the
    /// server's descending `completed_at` ordering.
    pub fn latest_completion(&self) -> Option<&Completion> {
        self.completions.first()
    }
}

/// Structure used to receive task creation data from the API.
/// It's a good practice to separate database models (`Task`)
/// from API models, as they may have different fields.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    pub title: String,
    pub description: Option<String>,
}

/// Body of `POST /api/tasks/{id}/complete`.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskPayload {
    pub completed_by: String,
}

/// Event pushed over the update channel after a successful mutation.
/// Clients treat any event as an invalidation signal and re-fetch the
/// full list rather than merging the payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    pub event: String,
    pub task_id: i64,
}

impl UpdateEvent {
    pub const TASK_UPDATED: &'static str = "task_updated";

    pub fn task_updated(task_id: i64) -> Self {
        Self {
            event: Self::TASK_UPDATED.to_string(),
            task_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serializes_with_camel_case_fields() {
        let task = Task {
            id: 1,
            title: "Take out trash".to_string(),
            description: None,
            archived: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn update_event_has_expected_wire_shape() {
        let event = UpdateEvent::task_updated(5);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"task_updated","taskId":5}"#);
    }

    #[test]
    fn latest_completion_is_first_entry() {
        let task = Task {
            id: 2,
            title: "Feed the cat".to_string(),
            description: Some("Wet food in the evening".to_string()),
            archived: false,
            created_at: Utc::now(),
        };
        let completions = vec![
            Completion {
                id: 11,
                task_id: 2,
                completed_by: "Mom".to_string(),
                completed_at: Utc::now(),
            },
            Completion {
                id: 10,
                task_id: 2,
                completed_by: "Dad".to_string(),
                completed_at: Utc::now() - chrono::Duration::hours(3),
            },
        ];

        let view = TaskWithCompletions::new(task, completions);
        assert_eq!(view.latest_completion().unwrap().completed_by, "Mom");
    }
}
