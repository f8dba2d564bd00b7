//! In-memory run registry.

use dashmap::DashMap;

use crate::models::{Run, RunStatus};

/// Process-lifetime registry of runs, keyed by run id.
///
/// Runs are created and read from any task; each run is mutated only by
/// the orchestration task driving it (plus the synchronous terminate
/// path, which the monotonic status guard makes safe).
#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: DashMap<String, Run>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a new queued run with a fresh id.
    pub fn create(&self) -> Run {
        let run = Run::new(uuid::Uuid::new_v4().to_string());
        self.runs.insert(run.run_id.clone(), run.clone());
        tracing::info!(run_id = %run.run_id, "run registered");
        run
    }

    /// Snapshot of a run by id.
    pub fn get(&self, run_id: &str) -> Option<Run> {
        self.runs.get(run_id).map(|r| r.clone())
    }

    /// Mutate a run in place. Returns false for an unknown id.
    pub fn update<F>(&self, run_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Run),
    {
        match self.runs.get_mut(run_id) {
            Some(mut run) => {
                f(&mut run);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of runs currently in the given status.
    pub fn count_with_status(&self, status: RunStatus) -> usize {
        self.runs.iter().filter(|r| r.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_unique_ids() {
        let registry = RunRegistry::new();
        let a = registry.create();
        let b = registry.create();
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.count_with_status(RunStatus::Queued), 2);
    }

    #[test]
    fn update_mutates_and_get_snapshots() {
        let registry = RunRegistry::new();
        let run = registry.create();

        assert!(registry.update(&run.run_id, |r| {
            r.set_status(RunStatus::Running);
            r.set_workflow_id("wf-7");
        }));
        let snapshot = registry.get(&run.run_id).unwrap();
        assert_eq!(snapshot.status, RunStatus::Running);
        assert_eq!(snapshot.workflow_id.as_deref(), Some("wf-7"));

        assert!(!registry.update("no-such-run", |_| {}));
        assert!(registry.get("no-such-run").is_none());
    }
}
