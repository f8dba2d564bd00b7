//! End-to-end pipeline runs against an in-process workflow engine.
//!
//! The engine fake chains the four stages the way the real engine's
//! workflow definition does: each completed task's output feeds the
//! next task's input. Workers run on the real polling runtime and the
//! orchestrator reconciles the run to a terminal state.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use vidgen_core::engine::{EngineResult, TaskState, WorkflowEngine, WorkflowStatus};
use vidgen_core::models::{Run, RunStatus, StepName, TaskStatus};
use vidgen_core::orchestrator::{Orchestrator, RunRegistry, RunRequest};
use vidgen_core::retry::{Backoff, RetryPolicy};
use vidgen_core::services::{
    ImageSynthesizer, ServiceError, ServiceResult, SpeechSynthesizer, TextGenerator,
};
use vidgen_core::storage::ContentStore;
use vidgen_core::workers::{
    AssembleWorker, AudioWorker, ImageWorker, ScriptWorker, TaskExecution, TaskResult,
    WorkerRuntime,
};

#[derive(Default)]
struct ChainState {
    pending: Option<TaskExecution>,
    dispatched: bool,
    task_statuses: BTreeMap<String, String>,
    images_output: Option<Value>,
    done: bool,
    failed: bool,
    next_task_id: u32,
}

/// Engine fake that dispatches the pipeline stages in order, wiring
/// each stage's output into the next stage's input.
#[derive(Default)]
struct ChainEngine {
    state: Mutex<ChainState>,
}

impl ChainEngine {
    fn queue_task(state: &mut ChainState, step: StepName, input: Value) {
        state.next_task_id += 1;
        state.pending = Some(TaskExecution {
            task_id: format!("t-{}", state.next_task_id),
            task_type: step.task_type().to_string(),
            input,
        });
        state.dispatched = false;
        state
            .task_statuses
            .insert(step.task_type().to_string(), "SCHEDULED".to_string());
    }
}

#[async_trait]
impl WorkflowEngine for ChainEngine {
    async fn start_workflow(&self, _: &str, input: Value, _: i32) -> EngineResult<String> {
        let mut state = self.state.lock().unwrap();
        ChainEngine::queue_task(
            &mut state,
            StepName::GenerateScript,
            json!({
                "topic": input["topic"],
                "duration": input["duration"],
                "voice": input["voice"],
            }),
        );
        Ok("wf-e2e".to_string())
    }

    async fn get_workflow_status(&self, _: &str) -> EngineResult<WorkflowStatus> {
        let state = self.state.lock().unwrap();
        let status = if state.failed {
            "FAILED"
        } else if state.done {
            "COMPLETED"
        } else {
            "RUNNING"
        };
        Ok(WorkflowStatus {
            status: status.to_string(),
            tasks: state
                .task_statuses
                .iter()
                .map(|(t, s)| TaskState {
                    task_type: t.clone(),
                    status: s.clone(),
                })
                .collect(),
        })
    }

    async fn terminate_workflow(&self, _: &str, _: &str) -> EngineResult<()> {
        Ok(())
    }

    async fn poll_task(&self, task_type: &str, _: &str) -> EngineResult<Option<TaskExecution>> {
        let mut state = self.state.lock().unwrap();
        match &state.pending {
            Some(task) if !state.dispatched && task.task_type == task_type => {
                let task = task.clone();
                state.dispatched = true;
                state
                    .task_statuses
                    .insert(task_type.to_string(), "IN_PROGRESS".to_string());
                Ok(Some(task))
            }
            _ => Ok(None),
        }
    }

    async fn update_task(&self, result: &TaskResult) -> EngineResult<()> {
        let mut state = self.state.lock().unwrap();
        if result.status == TaskStatus::Failed {
            state
                .task_statuses
                .insert(result.task_type.clone(), "FAILED".to_string());
            state.pending = None;
            state.failed = true;
            return Ok(());
        }
        state
            .task_statuses
            .insert(result.task_type.clone(), "COMPLETED".to_string());
        state.pending = None;

        let output = &result.output;
        match StepName::from_task_type(&result.task_type) {
            Some(StepName::GenerateScript) => ChainEngine::queue_task(
                &mut state,
                StepName::GenerateImages,
                json!({ "script": output["script"] }),
            ),
            Some(StepName::GenerateImages) => {
                state.images_output = Some(output.clone());
                ChainEngine::queue_task(
                    &mut state,
                    StepName::GenerateAudio,
                    json!({ "script": output["script"] }),
                );
            }
            Some(StepName::GenerateAudio) => {
                let images = state
                    .images_output
                    .as_ref()
                    .map(|o| o["images"].clone())
                    .unwrap_or(Value::Null);
                ChainEngine::queue_task(
                    &mut state,
                    StepName::AssembleVideo,
                    json!({
                        "script": output["script"],
                        "images": images,
                        "audioFiles": output["audioFiles"],
                    }),
                );
            }
            Some(StepName::AssembleVideo) => {
                state.done = true;
            }
            None => {}
        }
        Ok(())
    }
}

struct StubText {
    response: Option<String>,
}

#[async_trait]
impl TextGenerator for StubText {
    async fn generate(&self, _: &str, _: u32, _: f64) -> ServiceResult<String> {
        match &self.response {
            Some(text) => Ok(text.clone()),
            None => Err(ServiceError::http_status("text generation", 503)),
        }
    }
}

struct StubImage {
    fail: bool,
}

#[async_trait]
impl ImageSynthesizer for StubImage {
    async fn synthesize(&self, _: &str, _: u32, _: u32) -> ServiceResult<Vec<u8>> {
        if self.fail {
            Err(ServiceError::http_status("image synthesis", 502))
        } else {
            Ok(vec![0xFF, 0xD8, 0xFF])
        }
    }
}

struct StubTts {
    fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for StubTts {
    async fn synthesize(&self, _: &str) -> ServiceResult<Vec<u8>> {
        if self.fail {
            Err(ServiceError::http_status("text-to-speech", 429))
        } else {
            Ok(vec![0x49, 0x44, 0x33])
        }
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<ContentStore>,
    runtime: WorkerRuntime,
    orchestrator: Arc<Orchestrator>,
}

fn fast() -> RetryPolicy {
    RetryPolicy::new(2, Backoff::Fixed(Duration::from_millis(1)))
}

fn harness(text: StubText, image: StubImage, tts: StubTts) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ContentStore::new(dir.path()));
    let engine: Arc<dyn WorkflowEngine> = Arc::new(ChainEngine::default());
    let video = vidgen_core::config::VideoSettings::default();

    let mut runtime = WorkerRuntime::new(Arc::clone(&engine), "e2e-worker");
    runtime.register(Arc::new(ScriptWorker::new(Arc::new(text), 30)));
    runtime.register(Arc::new(
        ImageWorker::new(Arc::new(image), Arc::clone(&store), &video)
            .with_timing(fast(), Duration::from_millis(1)),
    ));
    runtime.register(Arc::new(
        AudioWorker::new(Arc::new(tts), Arc::clone(&store))
            .with_timing(fast(), Duration::from_millis(1)),
    ));
    runtime.register(Arc::new(AssembleWorker::new(
        Arc::clone(&store),
        video.width,
        video.height,
        video.fps,
    )));

    let orchestrator = Arc::new(
        Orchestrator::new(
            Arc::new(RunRegistry::new()),
            engine,
            Arc::clone(&store),
            "video_generation_workflow",
            1,
        )
        .with_timing(Duration::from_millis(10), Duration::from_secs(30)),
    );

    Harness {
        _dir: dir,
        store,
        runtime,
        orchestrator,
    }
}

async fn run_to_terminal(harness: &Harness, request: RunRequest) -> Run {
    harness.runtime.start();
    let run_id = harness.orchestrator.launch(request);

    let deadline = Instant::now() + Duration::from_secs(30);
    let run = loop {
        if let Some(run) = harness.orchestrator.registry().get(&run_id) {
            if run.status.is_terminal() {
                break run;
            }
        }
        assert!(Instant::now() < deadline, "pipeline never finished");
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    harness.runtime.stop();
    run
}

fn request(topic: &str, duration: u32) -> RunRequest {
    RunRequest {
        topic: topic.to_string(),
        duration: Some(duration),
        voice: None,
    }
}

#[tokio::test]
async fn healthy_services_produce_a_complete_project() {
    let script = json!({
        "title": "Solar Eclipses",
        "totalDuration": 12,
        "scenes": [
            {"startTime": 0, "duration": 6, "text": "The moon moves.",
             "visualDescription": "moon crossing the sun"},
            {"startTime": 6, "duration": 6, "text": "Day becomes night.",
             "visualDescription": "darkened landscape"},
        ],
    });
    let h = harness(
        StubText {
            response: Some(script.to_string()),
        },
        StubImage { fail: false },
        StubTts { fail: false },
    );

    let run = run_to_terminal(&h, request("solar eclipses", 12)).await;

    assert_eq!(run.status, RunStatus::Completed);
    for step in StepName::ALL {
        assert_eq!(run.steps[&step], "COMPLETED", "step {step}");
    }
    assert!(run.artifacts.contains(&"output/video_project.json".to_string()));
    assert!(run.artifacts.contains(&"output/video_preview.html".to_string()));
    assert!(run.artifacts.contains(&"temp/scene_1.jpg".to_string()));
    assert!(run.artifacts.contains(&"temp/audio_scene_1.mp3".to_string()));

    let body = std::fs::read_to_string(h.store.resolve("output/video_project.json")).unwrap();
    let project: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(project["title"], "Solar Eclipses");
    assert_eq!(project["statistics"]["scenesWithImages"], 2);
    assert_eq!(project["statistics"]["scenesWithAudio"], 2);
    assert_eq!(project["statistics"]["placeholderAudio"], 0);
}

#[tokio::test]
async fn total_service_outage_still_completes_with_fallbacks() {
    let h = harness(
        StubText { response: None },
        StubImage { fail: true },
        StubTts { fail: true },
    );

    let run = run_to_terminal(&h, request("solar eclipses", 15)).await;

    // Every stage degrades rather than failing the workflow.
    assert_eq!(run.status, RunStatus::Completed);
    for step in StepName::ALL {
        assert_eq!(run.steps[&step], "COMPLETED", "step {step}");
    }

    let body = std::fs::read_to_string(h.store.resolve("output/video_project.json")).unwrap();
    let project: Value = serde_json::from_str(&body).unwrap();

    // The fallback script covers the requested duration with 2-5 scenes.
    assert_eq!(project["totalDuration"], 15);
    let scenes = project["scenes"].as_array().unwrap();
    assert!((2..=5).contains(&scenes.len()));

    // No images were produced; every scene got a placeholder narration,
    // which does not count as playable audio.
    let n = scenes.len() as u64;
    assert_eq!(project["statistics"]["scenesWithImages"], 0);
    assert_eq!(project["statistics"]["scenesWithAudio"], 0);
    assert_eq!(project["statistics"]["placeholderAudio"], n);
    for scene in scenes {
        assert_eq!(scene["hasImage"], false);
        assert_eq!(scene["hasAudio"], false);
        assert_eq!(scene["isPlaceholderAudio"], true);
    }

    assert!(!run.artifacts.iter().any(|a| a.starts_with("temp/scene_")));
    assert!(run
        .artifacts
        .iter()
        .any(|a| a.starts_with("temp/placeholder_audio_")));
}

#[tokio::test]
async fn invalid_stage_input_fails_the_run() {
    // An engine that dispatches a script task with no topic.
    #[derive(Default)]
    struct BadInputEngine {
        state: Mutex<ChainState>,
    }

    #[async_trait]
    impl WorkflowEngine for BadInputEngine {
        async fn start_workflow(&self, _: &str, _: Value, _: i32) -> EngineResult<String> {
            let mut state = self.state.lock().unwrap();
            ChainEngine::queue_task(&mut state, StepName::GenerateScript, json!({}));
            Ok("wf-bad".to_string())
        }

        async fn get_workflow_status(&self, _: &str) -> EngineResult<WorkflowStatus> {
            let state = self.state.lock().unwrap();
            let status = if state.failed { "FAILED" } else { "RUNNING" };
            Ok(WorkflowStatus {
                status: status.to_string(),
                tasks: Vec::new(),
            })
        }

        async fn terminate_workflow(&self, _: &str, _: &str) -> EngineResult<()> {
            Ok(())
        }

        async fn poll_task(&self, task_type: &str, _: &str) -> EngineResult<Option<TaskExecution>> {
            let mut state = self.state.lock().unwrap();
            match &state.pending {
                Some(task) if !state.dispatched && task.task_type == task_type => {
                    let task = task.clone();
                    state.dispatched = true;
                    Ok(Some(task))
                }
                _ => Ok(None),
            }
        }

        async fn update_task(&self, result: &TaskResult) -> EngineResult<()> {
            let mut state = self.state.lock().unwrap();
            state.pending = None;
            if result.status == TaskStatus::Failed {
                state.failed = true;
            }
            Ok(())
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ContentStore::new(dir.path()));
    let engine: Arc<dyn WorkflowEngine> = Arc::new(BadInputEngine::default());

    let mut runtime = WorkerRuntime::new(Arc::clone(&engine), "e2e-worker");
    runtime.register(Arc::new(ScriptWorker::new(
        Arc::new(StubText { response: None }),
        30,
    )));
    runtime.start();

    let orchestrator = Arc::new(
        Orchestrator::new(
            Arc::new(RunRegistry::new()),
            engine,
            store,
            "video_generation_workflow",
            1,
        )
        .with_timing(Duration::from_millis(10), Duration::from_secs(30)),
    );
    let run_id = orchestrator.launch(request("", 0));

    let deadline = Instant::now() + Duration::from_secs(30);
    let run = loop {
        if let Some(run) = orchestrator.registry().get(&run_id) {
            if run.status.is_terminal() {
                break run;
            }
        }
        assert!(Instant::now() < deadline, "run never finished");
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    runtime.stop();

    assert_eq!(run.status, RunStatus::Failed);
}
