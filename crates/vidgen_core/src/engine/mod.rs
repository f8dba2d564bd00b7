//! Workflow engine interface.
//!
//! The rest of the crate depends only on the [`WorkflowEngine`] trait:
//! the orchestrator uses it to start, poll, and terminate workflows,
//! and the worker runtime uses it to fetch and report task executions.
//! [`HttpWorkflowEngine`] is the production implementation against a
//! Conductor-style REST API; tests substitute mocks.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workers::{TaskExecution, TaskResult};

pub use http::HttpWorkflowEngine;

/// Errors from workflow engine calls.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Engine returned HTTP {status} for {operation}")]
    UnexpectedStatus { operation: String, status: u16 },

    #[error("Failed to decode engine response for {operation}: {message}")]
    Decode { operation: String, message: String },
}

impl EngineError {
    pub fn unexpected_status(operation: impl Into<String>, status: u16) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            status,
        }
    }

    pub fn decode(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Overall workflow state plus embedded per-task states, as fetched
/// from the engine on each poll.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowStatus {
    /// Raw engine state string (`RUNNING`, `COMPLETED`, `FAILED`,
    /// `TIMED_OUT`, `TERMINATED`, ...).
    #[serde(default)]
    pub status: String,

    /// Per-task states embedded in the workflow execution.
    #[serde(default)]
    pub tasks: Vec<TaskState>,
}

impl WorkflowStatus {
    /// Whether the engine considers this workflow finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status.as_str(),
            "COMPLETED" | "FAILED" | "TIMED_OUT" | "TERMINATED"
        )
    }
}

/// State of one task inside a workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskState {
    /// Task definition name; matched against the pipeline step names.
    #[serde(rename = "taskType")]
    pub task_type: String,

    /// Raw engine task status string.
    #[serde(default)]
    pub status: String,
}

/// Client interface to the external workflow orchestration engine.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Submit a workflow execution. Returns the engine's workflow id.
    async fn start_workflow(
        &self,
        name: &str,
        input: serde_json::Value,
        version: i32,
    ) -> EngineResult<String>;

    /// Fetch the current status of a workflow, including task states.
    async fn get_workflow_status(&self, workflow_id: &str) -> EngineResult<WorkflowStatus>;

    /// Ask the engine to cancel a workflow. Best effort.
    async fn terminate_workflow(&self, workflow_id: &str, reason: &str) -> EngineResult<()>;

    /// Poll for a pending task of the given type. `None` when no task
    /// is currently queued for this worker.
    async fn poll_task(
        &self,
        task_type: &str,
        worker_id: &str,
    ) -> EngineResult<Option<TaskExecution>>;

    /// Report a finished task execution back to the engine.
    async fn update_task(&self, result: &TaskResult) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_status_terminal_states() {
        for s in ["COMPLETED", "FAILED", "TIMED_OUT", "TERMINATED"] {
            let status = WorkflowStatus {
                status: s.to_string(),
                tasks: Vec::new(),
            };
            assert!(status.is_terminal(), "{} should be terminal", s);
        }
        let running = WorkflowStatus {
            status: "RUNNING".to_string(),
            tasks: Vec::new(),
        };
        assert!(!running.is_terminal());
    }

    #[test]
    fn task_state_decodes_engine_shape() {
        let status: WorkflowStatus = serde_json::from_str(
            r#"{
                "status": "RUNNING",
                "tasks": [
                    {"taskType": "generate_script", "status": "COMPLETED"},
                    {"taskType": "FORK_JOIN", "status": "IN_PROGRESS"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(status.tasks.len(), 2);
        assert_eq!(status.tasks[0].task_type, "generate_script");
        assert_eq!(status.tasks[0].status, "COMPLETED");
    }
}
