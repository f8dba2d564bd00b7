//! Core enums for run and task lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a run.
///
/// Transitions are monotonic: `Queued -> Running -> {Completed, Failed,
/// Terminated, Timeout}`. Once a terminal status is reached the run never
/// changes status again (enforced by [`super::Run::set_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run created, workflow not yet submitted to the engine.
    Queued,
    /// Workflow submitted and being polled.
    Running,
    /// Engine reported the workflow completed.
    Completed,
    /// Engine reported failure (or the workflow could not be started).
    Failed,
    /// An operator terminated the run.
    Terminated,
    /// The monitor's wall-clock ceiling elapsed before a terminal
    /// engine status was observed. Distinct from `Failed`.
    Timeout,
}

impl RunStatus {
    /// Whether this status is terminal (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Terminated | RunStatus::Timeout
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Queued => "QUEUED",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
            RunStatus::Terminated => "TERMINATED",
            RunStatus::Timeout => "TIMEOUT",
        };
        write!(f, "{}", s)
    }
}

/// The four fixed pipeline steps, in execution order.
///
/// The wire names match the task definition names registered with the
/// workflow engine, so engine task states can be projected directly
/// onto a run's step map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StepName {
    #[serde(rename = "generate_script")]
    GenerateScript,
    #[serde(rename = "generate_images")]
    GenerateImages,
    #[serde(rename = "generate_audio")]
    GenerateAudio,
    #[serde(rename = "assemble_video")]
    AssembleVideo,
}

impl StepName {
    /// All steps in pipeline order.
    pub const ALL: [StepName; 4] = [
        StepName::GenerateScript,
        StepName::GenerateImages,
        StepName::GenerateAudio,
        StepName::AssembleVideo,
    ];

    /// Task definition name used by the workflow engine.
    pub fn task_type(self) -> &'static str {
        match self {
            StepName::GenerateScript => "generate_script",
            StepName::GenerateImages => "generate_images",
            StepName::GenerateAudio => "generate_audio",
            StepName::AssembleVideo => "assemble_video",
        }
    }

    /// Map an engine task type back to a step. Unknown task types
    /// (system tasks, forks, etc.) return `None` and are ignored.
    pub fn from_task_type(task_type: &str) -> Option<StepName> {
        StepName::ALL
            .into_iter()
            .find(|s| s.task_type() == task_type)
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.task_type())
    }
}

/// Terminal status of a single worker task execution.
///
/// The workflow engine only understands these two outcomes; anything a
/// worker raises internally is converted to `Failed` by the execution
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Completed,
    Failed,
}
