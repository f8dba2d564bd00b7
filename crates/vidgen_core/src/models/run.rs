//! The `Run` record: one tracked pipeline execution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::{RunStatus, StepName};

/// Step status value for steps the engine has not yet reported on.
pub const STEP_PENDING: &str = "PENDING";

/// One end-to-end pipeline execution, tracked in the run registry.
///
/// A run is mutated exclusively by the orchestration task that drives
/// it; the boundary layer only reads (clones) it. `steps` always holds
/// exactly the four pipeline steps - keys are fixed at creation and
/// never removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Opaque unique identifier, immutable after creation.
    pub run_id: String,
    /// Local lifecycle status; monotonic toward a terminal state.
    pub status: RunStatus,
    /// Per-step status as last projected from engine task states.
    pub steps: BTreeMap<StepName, String>,
    /// Relative artifact paths, populated once on completion.
    pub artifacts: Vec<String>,
    /// Engine identifier for the started workflow; set at most once.
    pub workflow_id: Option<String>,
    /// Last raw status string observed from the engine. Advisory only;
    /// `status` is the authoritative local state.
    pub engine_status: Option<String>,
}

impl Run {
    /// Create a queued run with all steps pending.
    pub fn new(run_id: impl Into<String>) -> Self {
        let steps = StepName::ALL
            .into_iter()
            .map(|s| (s, STEP_PENDING.to_string()))
            .collect();
        Self {
            run_id: run_id.into(),
            status: RunStatus::Queued,
            steps,
            artifacts: Vec::new(),
            workflow_id: None,
            engine_status: None,
        }
    }

    /// Transition the run status, ignoring any write after a terminal
    /// status has been reached. Returns whether the transition applied.
    pub fn set_status(&mut self, status: RunStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    /// Record the engine workflow id. First write wins.
    pub fn set_workflow_id(&mut self, workflow_id: impl Into<String>) {
        if self.workflow_id.is_none() {
            self.workflow_id = Some(workflow_id.into());
        }
    }

    /// Update one step's status from an observed engine task state.
    pub fn set_step_status(&mut self, step: StepName, status: impl Into<String>) {
        self.steps.insert(step, status.into());
    }
}
