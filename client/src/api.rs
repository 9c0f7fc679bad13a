// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{bail, Context, Result};
use common::{CompleteTaskPayload, Completion, TaskWithCompletions};
use serde::Deserialize;

/// Error body the server sends on 4xx/5xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Body of `GET /api/health`.
#[derive(Deserialize)]
struct HealthBody {
    status: String,
}

/// Thin HTTP client for the task service.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetches the active tasks with today's completions.
    pub async fn fetch_today(&self) -> Result<Vec<TaskWithCompletions>> {
        let response = self
            .http
            .get(format!("{}/api/tasks/today", self.base_url))
            .send()
            .await
            .context("Failed to reach the task service")?;

        let response = Self::check(response).await?;
        response
            .json::<Vec<TaskWithCompletions>>()
            .await
            .context("Failed to decode task list")
    }

    /// Records a completion for `task_id` on behalf of `completed_by`.
    pub async fn complete_task(&self, task_id: i64, completed_by: &str) -> Result<Completion> {
        let payload = CompleteTaskPayload {
            completed_by: completed_by.to_string(),
        };

        let response = self
            .http
            .post(format!("{}/api/tasks/{}/complete", self.base_url, task_id))
            .json(&payload)
            .send()
            .await
            .context("Failed to reach the task service")?;

        let response = Self::check(response).await?;
        response
            .json::<Completion>()
            .await
            .context("Failed to decode completion")
    }

    /// Probes the service's liveness endpoint. Ok means the server
    /// answered `{"status":"UP"}`.
    pub async fn health(&self) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .context("Failed to reach the task service")?;

        let response = Self::check(response).await?;
        let body = response
            .json::<HealthBody>()
            .await
            .context("Failed to decode health status")?;
        if body.status != "UP" {
            bail!("Task service reported status {:?}", body.status);
        }
        Ok(())
    }

    /// Turns a non-success response into an error carrying the server's
    /// `{"error": ...}` message when one is present.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("HTTP error {}", status));
        bail!(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new("http://localhost:5001/");
        assert_eq!(client.base_url, "http://localhost:5001");
    }
}
