// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::{Completion, CreateTaskPayload, Task, TaskWithCompletions};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

/// Establishes the database connection pool.
/// If the database file does not exist, it creates it. The SQLite
/// `foreign_keys` pragma is enabled on every connection so the
/// tasks -> completions cascade is enforced.
/// It also ensures the `tasks` and `completions` tables exist.
pub async fn establish_connection_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .context("Invalid database URL")?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options)
        .await
        .context("Failed to connect to database")?;

    create_schema(&pool).await?;

    info!("'tasks' and 'completions' tables are ready.");

    Ok(pool)
}

/// Creates the schema. Shared with the test setup so the two can never
/// drift apart.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NULL,
            archived BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'tasks' table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS completions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            completed_by TEXT NOT NULL,
            completed_at TIMESTAMP NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'completions' table")?;

    Ok(())
}

/// The UTC day boundaries used for "today". Completions are filtered to
/// this half-open range server-side, keeping payloads small and the
/// "done for today" rule consistent across clients.
fn today_range_utc() -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc::now()
        .date_naive()
        .and_time(chrono::NaiveTime::MIN)
        .and_utc();
    (start, start + chrono::Duration::days(1))
}

/// Retrieves all active (non-archived) tasks ordered by creation time,
/// each carrying its completions for the current UTC day ordered most
/// recent first.
pub async fn get_todays_tasks_from_db(pool: &SqlitePool) -> Result<Vec<TaskWithCompletions>> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE archived = FALSE ORDER BY created_at ASC;",
    )
    .fetch_all(pool)
    .await
    .context("Failed to retrieve active tasks from DB")?;

    let (day_start, day_end) = today_range_utc();
    let completions = sqlx::query_as::<_, Completion>(
        "SELECT * FROM completions WHERE completed_at >= ? AND completed_at < ? ORDER BY completed_at DESC;",
    )
    .bind(day_start)
    .bind(day_end)
    .fetch_all(pool)
    .await
    .context("Failed to retrieve today's completions from DB")?;

    // Group completions per task. The per-task order is preserved from
    // the descending query above.
    let mut by_task: HashMap<i64, Vec<Completion>> = HashMap::new();
    for completion in completions {
        by_task.entry(completion.task_id).or_default().push(completion);
    }

    Ok(tasks
        .into_iter()
        .map(|task| {
            let completions = by_task.remove(&task.id).unwrap_or_default();
            TaskWithCompletions::new(task, completions)
        })
        .collect())
}

/// Inserts a new task into the database.
pub async fn create_task_in_db(pool: &SqlitePool, payload: CreateTaskPayload) -> Result<Task> {
    let created_at = Utc::now();

    debug!(
        "Insert values: title={}, description={:?}, created_at={}",
        payload.title, payload.description, created_at
    );

    let id = sqlx::query(
        "INSERT INTO tasks (title, description, archived, created_at) VALUES (?, ?, FALSE, ?)",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(created_at)
    .execute(pool)
    .await
    .context("Failed to insert task into DB")?
    .last_insert_rowid();

    Ok(Task {
        id,
        title: payload.title,
        description: payload.description,
        archived: false,
        created_at,
    })
}

/// Records a completion for an active task. The completion timestamp is
/// assigned here, never taken from the caller.
/// Returns `None` when the task does not exist or is archived; nothing
/// is written in that case.
#[allow(clippy::uninlined_format_args)]
pub async fn complete_task_in_db(
    pool: &SqlitePool,
    task_id: i64,
    completed_by: &str,
) -> Result<Option<Completion>> {
    let active_task = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE id = ? AND archived = FALSE;",
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await
    .context(format!("Failed to look up task with ID: {}", task_id))?;

    if active_task.is_none() {
        debug!("No active task with ID {} to complete.", task_id);
        return Ok(None);
    }

    let completed_at = Utc::now();
    let id = sqlx::query(
        "INSERT INTO completions (task_id, completed_by, completed_at) VALUES (?, ?, ?)",
    )
    .bind(task_id)
    .bind(completed_by)
    .bind(completed_at)
    .execute(pool)
    .await
    .context(format!("Failed to insert completion for task ID: {}", task_id))?
    .last_insert_rowid();

    info!("Recorded completion {} for task {}.", id, task_id);

    Ok(Some(Completion {
        id,
        task_id,
        completed_by: completed_by.to_string(),
        completed_at,
    }))
}

/// Archives a task so it no longer appears in the active list.
/// Returns true if a task was updated, false if no active task with the
/// given ID was found.
#[allow(clippy::uninlined_format_args)]
pub async fn archive_task_in_db(pool: &SqlitePool, task_id: i64) -> Result<bool> {
    debug!("Attempting to archive task with ID: {}", task_id);
    let result = sqlx::query(
        "UPDATE tasks SET archived = TRUE WHERE id = ? AND archived = FALSE", // Only update active tasks
    )
    .bind(task_id)
    .execute(pool)
    .await
    .context(format!("Failed to archive task with ID: {}", task_id))?;

    let rows_affected = result.rows_affected();
    info!("Archived {} rows for task ID: {}", rows_affected, task_id);

    Ok(rows_affected > 0)
}
