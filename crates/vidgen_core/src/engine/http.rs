//! Conductor-style REST implementation of [`WorkflowEngine`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};

use super::{EngineError, EngineResult, WorkflowEngine, WorkflowStatus};
use crate::config::EngineSettings;
use crate::services::CLIENT_ID;
use crate::workers::{TaskExecution, TaskResult};

/// HTTP client for a Conductor-style workflow engine.
pub struct HttpWorkflowEngine {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpWorkflowEngine {
    /// Build a client from engine settings with the given request timeout.
    pub fn new(settings: &EngineSettings, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(CLIENT_ID)
            .build()?;
        Ok(Self {
            client,
            base_url: settings.server_url.trim_end_matches('/').to_string(),
            auth_token: settings.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header("X-Authorization", token),
            None => request,
        }
    }
}

#[async_trait]
impl WorkflowEngine for HttpWorkflowEngine {
    async fn start_workflow(
        &self,
        name: &str,
        input: serde_json::Value,
        version: i32,
    ) -> EngineResult<String> {
        let request = self
            .client
            .post(self.url(&format!("workflow/{}", name)))
            .query(&[("version", version)])
            .json(&input);
        let response = self.authorized(request).send().await?;

        if !response.status().is_success() {
            return Err(EngineError::unexpected_status(
                "start_workflow",
                response.status().as_u16(),
            ));
        }

        // The engine answers with the bare workflow id.
        let workflow_id = response.text().await?.trim_matches('"').to_string();
        if workflow_id.is_empty() {
            return Err(EngineError::decode("start_workflow", "empty workflow id"));
        }
        tracing::info!(workflow = name, workflow_id, "started workflow");
        Ok(workflow_id)
    }

    async fn get_workflow_status(&self, workflow_id: &str) -> EngineResult<WorkflowStatus> {
        let request = self
            .client
            .get(self.url(&format!("workflow/{}", workflow_id)))
            .query(&[("includeTasks", "true")]);
        let response = self.authorized(request).send().await?;

        if !response.status().is_success() {
            return Err(EngineError::unexpected_status(
                "get_workflow_status",
                response.status().as_u16(),
            ));
        }

        response
            .json::<WorkflowStatus>()
            .await
            .map_err(|e| EngineError::decode("get_workflow_status", e.to_string()))
    }

    async fn terminate_workflow(&self, workflow_id: &str, reason: &str) -> EngineResult<()> {
        let request = self
            .client
            .delete(self.url(&format!("workflow/{}", workflow_id)))
            .query(&[("reason", reason)]);
        let response = self.authorized(request).send().await?;

        if !response.status().is_success() {
            return Err(EngineError::unexpected_status(
                "terminate_workflow",
                response.status().as_u16(),
            ));
        }
        tracing::info!(workflow_id, reason, "terminated workflow");
        Ok(())
    }

    async fn poll_task(
        &self,
        task_type: &str,
        worker_id: &str,
    ) -> EngineResult<Option<TaskExecution>> {
        let request = self
            .client
            .get(self.url(&format!("tasks/poll/{}", task_type)))
            .query(&[("workerid", worker_id)]);
        let response = self.authorized(request).send().await?;

        // No pending task for this type.
        if response.status() == StatusCode::NO_CONTENT || response.status() == StatusCode::NOT_FOUND
        {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(EngineError::unexpected_status(
                "poll_task",
                response.status().as_u16(),
            ));
        }

        response
            .json::<TaskExecution>()
            .await
            .map(Some)
            .map_err(|e| EngineError::decode("poll_task", e.to_string()))
    }

    async fn update_task(&self, result: &TaskResult) -> EngineResult<()> {
        let request = self.client.post(self.url("tasks")).json(result);
        let response = self.authorized(request).send().await?;

        if !response.status().is_success() {
            return Err(EngineError::unexpected_status(
                "update_task",
                response.status().as_u16(),
            ));
        }
        Ok(())
    }
}
