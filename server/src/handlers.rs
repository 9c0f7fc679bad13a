// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::database;
use crate::routes::AppState;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::{CompleteTaskPayload, Completion, CreateTaskPayload, Task, TaskWithCompletions, UpdateEvent};
use tracing::{debug, error, info};

/// Liveness probe. No side effects.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "UP" }))
}

/// Handler for listing active tasks with today's completions.
pub async fn list_tasks(
    State(state): State<AppState>, // State injection (DB pool + broadcaster)
) -> Result<Json<Vec<TaskWithCompletions>>, ApiError> {
    let tasks = database::get_todays_tasks_from_db(&state.pool).await?;
    info!("Successfully retrieved {} active tasks.", tasks.len());
    Ok(Json(tasks))
}

/// Handler for creating a new task.
#[allow(clippy::uninlined_format_args)]
pub async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<CreateTaskPayload>, // Extracting the request body as JSON
) -> Result<(StatusCode, Json<Task>), ApiError> {
    debug!("Received request to create task: {:?}", payload.title);

    if payload.title.trim().is_empty() {
        error!("Validation failed: task title is empty.");
        return Err(ApiError::Validation("Task title cannot be empty.".to_string()));
    }

    let new_task = database::create_task_in_db(&state.pool, payload).await?;

    info!("Task created successfully with ID: {}", new_task.id);
    state.broadcaster.publish(UpdateEvent::task_updated(new_task.id));

    // Return a 201 Created status with the new task as JSON.
    Ok((StatusCode::CREATED, Json(new_task)))
}

/// Handler for recording a completion on an active task.
///
/// The broadcast only ever follows a confirmed write: validation and
/// not-found failures return before the insert, and a storage failure
/// propagates before the publish.
#[allow(clippy::uninlined_format_args)]
pub async fn complete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>, // Extract task ID from the URL path
    Json(payload): Json<CompleteTaskPayload>,
) -> Result<Json<Completion>, ApiError> {
    debug!("Received completion for task {} by {:?}.", task_id, payload.completed_by);

    let completed_by = payload.completed_by.trim();
    if completed_by.is_empty() {
        error!("Validation failed: completedBy is empty.");
        return Err(ApiError::Validation("completedBy cannot be empty.".to_string()));
    }

    let completion = database::complete_task_in_db(&state.pool, task_id, completed_by)
        .await?
        .ok_or_else(|| {
            error!("No active task with ID {} to complete.", task_id);
            ApiError::NotFound(format!("No active task with ID {}.", task_id))
        })?;

    info!("Task {} completed by {}.", task_id, completion.completed_by);
    state.broadcaster.publish(UpdateEvent::task_updated(task_id));

    Ok(Json(completion))
}

/// Handler for archiving a task by ID.
#[allow(clippy::uninlined_format_args)]
pub async fn archive_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Attempting to archive task with ID: {}", task_id);

    let archived = database::archive_task_in_db(&state.pool, task_id).await?;

    if archived {
        info!("Task with ID {} archived successfully.", task_id);
        state.broadcaster.publish(UpdateEvent::task_updated(task_id));
        Ok(Json(serde_json::json!({ "id": task_id, "archived": true })))
    } else {
        error!("Task with ID {} not found for archival.", task_id);
        Err(ApiError::NotFound(format!(
            "No active task with ID {}.",
            task_id
        )))
    }
}

// --- Custom Error Handling ---
// Transforms our internal errors (e.g., from the database) into
// appropriate HTTP responses, without leaking internal detail.

/// The application's error taxonomy at the HTTP boundary.
pub enum ApiError {
    /// Bad or missing input (400).
    Validation(String),
    /// Referenced task absent or archived (404).
    NotFound(String),
    /// Persistence layer failure (500). The detail is logged, never sent.
    Storage(anyhow::Error),
}

/// Allows converting an `anyhow::Error` (coming from `database.rs`)
/// into our `ApiError`.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Storage(err)
    }
}

/// Allows Axum to convert our `ApiError` into an HTTP `Response`.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Storage(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred.".to_string(),
                )
            }
        };
        error!(
            "Responding with error: status_code={}, message={}",
            code.as_u16(),
            message
        );
        (code, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
