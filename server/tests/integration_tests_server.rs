// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{Completion, Task, TaskWithCompletions, UpdateEvent};
use futures_util::StreamExt;
use http_body_util::BodyExt; // For `collect`
use serde_json::json;
use server::broadcast::UpdateBroadcaster;
use server::routes::{create_router, AppState};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tower::ServiceExt; // For `oneshot`

/// Helper function to set up a fresh, in-memory database for each test.
async fn setup_test_state() -> AppState {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid in-memory URL")
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(options)
        .await
        .expect("Failed to connect to in-memory SQLite");

    server::database::create_schema(&pool)
        .await
        .expect("Failed to create schema in test DB");

    AppState {
        pool,
        broadcaster: UpdateBroadcaster::default(),
    }
}

/// Seeds an active task directly, bypassing the API.
async fn seed_task(pool: &SqlitePool, title: &str) -> i64 {
    sqlx::query("INSERT INTO tasks (title, description, archived, created_at) VALUES (?, NULL, FALSE, ?)")
        .bind(title)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await
        .expect("Failed to seed task")
        .last_insert_rowid()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let state = setup_test_state().await;
    let app = create_router(state);

    let response = app.oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "status": "UP" }));
}

#[tokio::test]
async fn test_list_seeded_task_with_empty_completions() {
    let state = setup_test_state().await;
    let task_id = seed_task(&state.pool, "Take out trash").await;
    let app = create_router(state);

    let response = app.oneshot(get("/api/tasks/today")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let tasks: Vec<TaskWithCompletions> = serde_json::from_slice(&body).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task_id);
    assert_eq!(tasks[0].title, "Take out trash");
    assert!(tasks[0].completions.is_empty());
}

#[tokio::test]
async fn test_complete_task_records_completion_and_broadcasts_once() {
    let state = setup_test_state().await;
    let task_id = seed_task(&state.pool, "Do the dishes").await;
    let mut events = state.broadcaster.subscribe();
    let app = create_router(state);

    // Act: mark the task complete
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/tasks/{task_id}/complete"),
            json!({ "completedBy": "Mom" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let completion: Completion = serde_json::from_slice(&body).unwrap();
    assert_eq!(completion.task_id, task_id);
    assert_eq!(completion.completed_by, "Mom");

    // Exactly one task_updated event fired.
    assert_eq!(events.try_recv().unwrap(), UpdateEvent::task_updated(task_id));
    assert!(events.try_recv().is_err());

    // A subsequent listing shows the completion as the first entry.
    let response = app.oneshot(get("/api/tasks/today")).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let tasks: Vec<TaskWithCompletions> = serde_json::from_slice(&body).unwrap();
    assert_eq!(tasks[0].completions[0].completed_by, "Mom");
    assert_eq!(tasks[0].completions[0].id, completion.id);
}

#[tokio::test]
async fn test_complete_missing_task_returns_404_without_broadcast() {
    let state = setup_test_state().await;
    let mut events = state.broadcaster.subscribe();
    let pool = state.pool.clone();
    let app = create_router(state);

    let response = app
        .oneshot(post_json(
            "/api/tasks/999/complete",
            json!({ "completedBy": "Mom" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(body.get("error").is_some());

    assert!(events.try_recv().is_err());
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM completions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn test_complete_with_empty_name_returns_400_without_write() {
    let state = setup_test_state().await;
    let task_id = seed_task(&state.pool, "Water plants").await;
    let mut events = state.broadcaster.subscribe();
    let pool = state.pool.clone();
    let app = create_router(state);

    let response = app
        .oneshot(post_json(
            &format!("/api/tasks/{task_id}/complete"),
            json!({ "completedBy": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(events.try_recv().is_err());

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM completions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn test_storage_failure_returns_500_without_broadcast() {
    let state = setup_test_state().await;
    let task_id = seed_task(&state.pool, "Sweep the porch").await;
    let mut events = state.broadcaster.subscribe();
    // Closing the pool makes every subsequent query fail, standing in
    // for an unreachable persistence layer.
    state.pool.close().await;
    let app = create_router(state);

    let response = app
        .oneshot(post_json(
            &format!("/api/tasks/{task_id}/complete"),
            json!({ "completedBy": "Mom" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    // Generic message only; no internal detail leaks.
    assert_eq!(body, json!({ "error": "An internal error occurred." }));

    // A failed write never publishes.
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_create_task_via_api() {
    let state = setup_test_state().await;
    let mut events = state.broadcaster.subscribe();
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/tasks",
            json!({ "title": "Feed the cat", "description": "Wet food" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let task: Task = serde_json::from_slice(&body).unwrap();
    assert_eq!(task.title, "Feed the cat");
    assert!(!task.archived);

    assert_eq!(events.try_recv().unwrap(), UpdateEvent::task_updated(task.id));

    let response = app.oneshot(get("/api/tasks/today")).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let tasks: Vec<TaskWithCompletions> = serde_json::from_slice(&body).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task.id);
}

#[tokio::test]
async fn test_archived_task_leaves_list_and_rejects_completions() {
    let state = setup_test_state().await;
    let task_id = seed_task(&state.pool, "Old chore").await;
    let app = create_router(state);

    let archive_request = Request::builder()
        .method("PUT")
        .uri(format!("/api/tasks/{task_id}/archive"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(archive_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Gone from the active list.
    let response = app.clone().oneshot(get("/api/tasks/today")).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let tasks: Vec<TaskWithCompletions> = serde_json::from_slice(&body).unwrap();
    assert!(tasks.is_empty());

    // And no longer completable.
    let response = app
        .oneshot(post_json(
            &format!("/api/tasks/{task_id}/complete"),
            json!({ "completedBy": "Mom" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// End-to-end check of the update channel: a real websocket client must
/// receive the frame produced by a successful completion.
#[tokio::test]
async fn test_update_channel_delivers_task_updated_frames() {
    let state = setup_test_state().await;
    let task_id = seed_task(&state.pool, "Walk the dog").await;
    let broadcaster = state.broadcaster.clone();
    let app = create_router(state);
    // Router clones share the same pool and broadcaster, so requests
    // driven through `mutator` reach the served websocket below.
    let mutator = app.clone();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/updates"))
        .await
        .expect("Failed to connect to update channel");

    // Wait for the server side of the socket to subscribe.
    for _ in 0..50 {
        if broadcaster.subscriber_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(broadcaster.subscriber_count() > 0);

    // Drive the mutation through the handler stack.
    let response = mutator
        .oneshot(post_json(
            &format!("/api/tasks/{task_id}/complete"),
            json!({ "completedBy": "Mom" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Timed out waiting for update frame")
        .expect("Update channel closed early")
        .expect("Update channel errored");
    let event: UpdateEvent = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(event, UpdateEvent::task_updated(task_id));
}
