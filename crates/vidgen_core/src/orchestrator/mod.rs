//! Run orchestration: the registry plus the reconciliation loop.
//!
//! The orchestrator owns the local view of every pipeline execution.
//! `launch` registers a run and spawns a driver task that submits the
//! workflow to the engine and then polls its status, projecting engine
//! task states onto the run's step map until a terminal state (or the
//! wall-clock ceiling) is reached. The engine remains the source of
//! truth for workflow execution; the registry is the source of truth
//! for what this process reports.

mod registry;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::engine::{EngineError, WorkflowEngine, WorkflowStatus};
use crate::models::{RunStatus, StepName};
use crate::storage::ContentStore;

pub use registry::RunRegistry;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600);

/// Errors from orchestration entry points.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Unknown run: {0}")]
    UnknownRun(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Parameters for a new pipeline run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    pub topic: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub voice: Option<String>,
}

/// Drives runs against the workflow engine.
pub struct Orchestrator {
    registry: Arc<RunRegistry>,
    engine: Arc<dyn WorkflowEngine>,
    store: Arc<ContentStore>,
    workflow_name: String,
    workflow_version: i32,
    poll_interval: Duration,
    max_wait: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<RunRegistry>,
        engine: Arc<dyn WorkflowEngine>,
        store: Arc<ContentStore>,
        workflow_name: impl Into<String>,
        workflow_version: i32,
    ) -> Self {
        Self {
            registry,
            engine,
            store,
            workflow_name: workflow_name.into(),
            workflow_version,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    /// Override the poll interval and wall-clock ceiling (tests use
    /// millisecond timings).
    pub fn with_timing(mut self, poll_interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.max_wait = max_wait;
        self
    }

    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    /// Register a run and spawn the task that drives it. Returns the
    /// run id immediately; progress is observed through the registry.
    pub fn launch(self: &Arc<Self>, request: RunRequest) -> String {
        let run = self.registry.create();
        let run_id = run.run_id.clone();

        let this = Arc::clone(self);
        let id = run_id.clone();
        tokio::spawn(async move {
            this.drive(id, request).await;
        });

        run_id
    }

    /// Submit the workflow and reconcile until terminal.
    async fn drive(&self, run_id: String, request: RunRequest) {
        let input = json!({
            "runId": run_id,
            "topic": request.topic,
            "duration": request.duration,
            "voice": request.voice,
        });

        let workflow_id = match self
            .engine
            .start_workflow(&self.workflow_name, input, self.workflow_version)
            .await
        {
            Ok(workflow_id) => workflow_id,
            Err(err) => {
                tracing::error!(run_id, %err, "failed to start workflow");
                self.registry.update(&run_id, |r| {
                    r.set_status(RunStatus::Failed);
                });
                return;
            }
        };

        tracing::info!(run_id, workflow_id, "workflow started");
        self.registry.update(&run_id, |r| {
            r.set_workflow_id(&workflow_id);
            r.set_status(RunStatus::Running);
        });

        self.monitor(&run_id, &workflow_id).await;
    }

    /// The reconciliation loop: poll the engine, mirror what it
    /// reports, stop on a terminal state or the wall-clock ceiling.
    /// Poll errors are absorbed; elapsed time keeps counting.
    async fn monitor(&self, run_id: &str, workflow_id: &str) {
        let started = Instant::now();

        loop {
            if started.elapsed() >= self.max_wait {
                tracing::warn!(run_id, workflow_id, "run exceeded wall-clock ceiling");
                self.registry.update(run_id, |r| {
                    r.set_status(RunStatus::Timeout);
                });
                return;
            }

            // The run may have been terminated out of band.
            match self.registry.get(run_id) {
                Some(run) if run.status.is_terminal() => return,
                Some(_) => {}
                None => return,
            }

            match self.engine.get_workflow_status(workflow_id).await {
                Ok(status) => {
                    self.project_status(run_id, &status);
                    if status.is_terminal() {
                        let local = map_terminal_status(&status.status);
                        self.registry.update(run_id, |r| {
                            r.set_status(local);
                        });
                        tracing::info!(run_id, status = %local, "run finished");
                        if local == RunStatus::Completed {
                            self.collect_artifacts(run_id).await;
                        }
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(run_id, workflow_id, %err, "status poll failed");
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Mirror the raw engine status and project task states onto the
    /// run's steps. Engine task types with no matching step (system
    /// tasks, forks) are ignored.
    fn project_status(&self, run_id: &str, status: &WorkflowStatus) {
        self.registry.update(run_id, |r| {
            r.engine_status = Some(status.status.clone());
            for task in &status.tasks {
                if let Some(step) = StepName::from_task_type(&task.task_type) {
                    r.set_step_status(step, task.status.clone());
                }
            }
        });
    }

    /// One-time artifact collection after a completed run.
    async fn collect_artifacts(&self, run_id: &str) {
        match self.store.list_artifacts().await {
            Ok(artifacts) => {
                tracing::info!(run_id, count = artifacts.len(), "artifacts collected");
                self.registry.update(run_id, |r| {
                    if r.artifacts.is_empty() {
                        r.artifacts = artifacts;
                    }
                });
            }
            Err(err) => {
                tracing::warn!(run_id, %err, "artifact listing failed");
            }
        }
    }

    /// Cancel a run: best-effort engine terminate, then the local state
    /// goes terminal immediately. An engine refusal is reported but
    /// does not undo the local transition.
    pub async fn terminate(&self, run_id: &str) -> Result<(), OrchestratorError> {
        let run = self
            .registry
            .get(run_id)
            .ok_or_else(|| OrchestratorError::UnknownRun(run_id.to_string()))?;

        self.registry.update(run_id, |r| {
            r.set_status(RunStatus::Terminated);
        });
        tracing::info!(run_id, "run terminated");

        if let Some(workflow_id) = &run.workflow_id {
            self.engine
                .terminate_workflow(workflow_id, "Cancelled by operator")
                .await?;
        }
        Ok(())
    }
}

/// Map a terminal engine status onto the local run lifecycle.
fn map_terminal_status(engine_status: &str) -> RunStatus {
    match engine_status {
        "COMPLETED" => RunStatus::Completed,
        _ => RunStatus::Failed,
    }
}
