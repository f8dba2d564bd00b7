//! The worker execution contract.
//!
//! Per invocation the lifecycle is RECEIVED -> PROCESSING ->
//! {COMPLETED, FAILED}. A transform failure of any kind becomes a
//! structured FAILED result; nothing raised inside a worker escapes
//! this boundary, because the workflow engine only understands the two
//! terminal states.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{WorkerError, WorkerResult};
use crate::models::TaskStatus;

/// A task instance dispatched by the workflow engine. Ephemeral: lives
/// only for the single execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskExecution {
    #[serde(rename = "taskId")]
    pub task_id: String,

    #[serde(rename = "taskType")]
    pub task_type: String,

    /// Stage-specific input payload.
    #[serde(rename = "inputData", default)]
    pub input: serde_json::Value,
}

/// Terminal result of a task execution, reported back to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(rename = "taskId")]
    pub task_id: String,

    #[serde(rename = "taskType")]
    pub task_type: String,

    pub status: TaskStatus,

    /// Output payload on success, `{"error": ...}` on failure.
    #[serde(rename = "outputData")]
    pub output: serde_json::Value,
}

impl TaskResult {
    pub fn completed(task: &TaskExecution, output: serde_json::Value) -> Self {
        Self {
            task_id: task.task_id.clone(),
            task_type: task.task_type.clone(),
            status: TaskStatus::Completed,
            output,
        }
    }

    pub fn failed(task: &TaskExecution, error: &WorkerError) -> Self {
        Self {
            task_id: task.task_id.clone(),
            task_type: task.task_type.clone(),
            status: TaskStatus::Failed,
            output: serde_json::json!({ "error": error.to_string() }),
        }
    }
}

/// A pipeline stage's transform under the uniform task lifecycle.
///
/// Workers may perform external I/O but must not mutate shared run
/// state; runs are owned by the orchestration loop.
#[async_trait]
pub trait StageWorker: Send + Sync {
    /// Task definition name this worker handles.
    fn task_def_name(&self) -> &str;

    /// How often the runtime polls the engine for this task type.
    fn poll_interval(&self) -> Duration {
        Duration::from_secs(1)
    }

    /// Run the stage transform on the task's input payload.
    async fn process(&self, input: &serde_json::Value) -> WorkerResult<serde_json::Value>;
}

/// Decode a stage's typed input from the opaque task payload.
///
/// Schema violations (missing required fields, wrong types) all surface
/// as the one uniform [`WorkerError::InvalidInput`] kind.
pub fn decode_input<T: DeserializeOwned>(task_type: &str, input: &serde_json::Value) -> WorkerResult<T> {
    serde_json::from_value(input.clone())
        .map_err(|e| WorkerError::invalid_input(format!("{}: {}", task_type, e)))
}

/// Execute a task through the uniform lifecycle. Always produces a
/// terminal, inspectable result.
pub async fn execute_task(worker: &dyn StageWorker, task: TaskExecution) -> TaskResult {
    let task_type = worker.task_def_name();
    tracing::debug!(task_id = %task.task_id, task_type, "task received");
    tracing::info!(task_id = %task.task_id, task_type, "processing task");

    match worker.process(&task.input).await {
        Ok(output) => {
            tracing::info!(task_id = %task.task_id, task_type, "task completed");
            TaskResult::completed(&task, output)
        }
        Err(err) => {
            tracing::error!(task_id = %task.task_id, task_type, %err, "task failed");
            TaskResult::failed(&task, &err)
        }
    }
}
