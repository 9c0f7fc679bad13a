// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::broadcast::UpdateBroadcaster;
use crate::handlers;
use crate::ws;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;

/// Everything the handlers need: the database pool and the update
/// channel's fan-out point. Cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub broadcaster: UpdateBroadcaster,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            broadcaster: UpdateBroadcaster::default(),
        }
    }
}

/// Creates and configures the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Liveness probe
        .route("/api/health", get(handlers::health_check))
        // Active tasks with today's completions
        .route("/api/tasks/today", get(handlers::list_tasks))
        // Create a new task
        .route("/api/tasks", post(handlers::create_task))
        // Record a completion for task `{id}`
        .route("/api/tasks/{id}/complete", post(handlers::complete_task))
        // Archive task `{id}` so it leaves the active list
        .route("/api/tasks/{id}/archive", put(handlers::archive_task))
        // Push channel: server -> clients only
        .route("/api/updates", get(ws::updates_ws))
        // Adds the shared state to the application
        .with_state(state)
}
