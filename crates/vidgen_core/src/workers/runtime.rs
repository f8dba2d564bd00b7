//! Worker runtime: hosts the stage workers' poll loops.
//!
//! An explicit runtime object rather than process-global state. One
//! background thread runs a dedicated async runtime with one poll loop
//! per registered worker; each loop asks the engine for a pending task,
//! executes it through the uniform lifecycle, and reports the result.
//! Start is idempotent and stop cancels the loops and joins the thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::contract::{execute_task, StageWorker};
use crate::engine::WorkflowEngine;

/// Hosts registered workers on a background polling thread.
pub struct WorkerRuntime {
    engine: Arc<dyn WorkflowEngine>,
    worker_id: String,
    workers: Vec<Arc<dyn StageWorker>>,
    started: AtomicBool,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl WorkerRuntime {
    pub fn new(engine: Arc<dyn WorkflowEngine>, worker_id: impl Into<String>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            engine,
            worker_id: worker_id.into(),
            workers: Vec::new(),
            started: AtomicBool::new(false),
            shutdown,
            handle: Mutex::new(None),
        }
    }

    /// Register a worker. Must happen before [`start`](Self::start).
    pub fn register(&mut self, worker: Arc<dyn StageWorker>) {
        self.workers.push(worker);
    }

    /// Spawn the polling thread. A second call is a no-op.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("worker runtime already started");
            return;
        }

        let engine = Arc::clone(&self.engine);
        let workers = self.workers.clone();
        let worker_id = self.worker_id.clone();
        let shutdown = self.shutdown.subscribe();
        let spawned = thread::Builder::new()
            .name("vidgen-workers".to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build();
                match runtime {
                    Ok(runtime) => {
                        runtime.block_on(run_loops(engine, workers, worker_id, shutdown))
                    }
                    Err(err) => tracing::error!(%err, "failed to build worker runtime"),
                }
            });

        match spawned {
            Ok(handle) => {
                tracing::info!(workers = self.workers.len(), "worker runtime started");
                *self.handle.lock() = Some(handle);
            }
            Err(err) => {
                tracing::error!(%err, "failed to spawn worker thread");
                self.started.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Signal the poll loops to stop and join the thread. The runtime
    /// is not restartable afterwards.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            } else {
                tracing::info!("worker runtime stopped");
            }
        }
    }
}

async fn run_loops(
    engine: Arc<dyn WorkflowEngine>,
    workers: Vec<Arc<dyn StageWorker>>,
    worker_id: String,
    shutdown: watch::Receiver<bool>,
) {
    let mut handles = Vec::with_capacity(workers.len());
    for worker in workers {
        handles.push(tokio::spawn(poll_loop(
            Arc::clone(&engine),
            worker,
            worker_id.clone(),
            shutdown.clone(),
        )));
    }
    for handle in handles {
        let _ = handle.await;
    }
}

/// One worker's poll loop. Poll errors are absorbed: a broken engine
/// connection must not tear the loop down.
async fn poll_loop(
    engine: Arc<dyn WorkflowEngine>,
    worker: Arc<dyn StageWorker>,
    worker_id: String,
    mut shutdown: watch::Receiver<bool>,
) {
    let task_type = worker.task_def_name().to_string();
    tracing::info!(task_type, "worker loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        match engine.poll_task(&task_type, &worker_id).await {
            Ok(Some(task)) => {
                let result = execute_task(worker.as_ref(), task).await;
                if let Err(err) = engine.update_task(&result).await {
                    tracing::error!(task_type, %err, "failed to report task result");
                }
                // Poll again immediately while work is queued.
                continue;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(task_type, %err, "task poll failed");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(worker.poll_interval()) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::info!(task_type, "worker loop stopped");
}
