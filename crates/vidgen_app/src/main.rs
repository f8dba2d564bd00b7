//! `vidgen` - drive the video generation pipeline from the command line.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use vidgen_core::config::Settings;
use vidgen_core::engine::{HttpWorkflowEngine, WorkflowEngine};
use vidgen_core::models::{RunStatus, StepName};
use vidgen_core::orchestrator::{Orchestrator, RunRegistry, RunRequest};
use vidgen_core::services::{
    http_client, HttpImageSynthesizer, HttpSpeechSynthesizer, HttpTextGenerator,
};
use vidgen_core::storage::ContentStore;
use vidgen_core::workers::{
    AssembleWorker, AudioWorker, ImageWorker, ScriptWorker, WorkerRuntime,
};

#[derive(Parser)]
#[command(name = "vidgen", version, about = "Automated video generation pipeline")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "vidgen.toml")]
    config: PathBuf,

    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a video project for a topic.
    Run {
        /// Topic to generate a video about.
        #[arg(long)]
        topic: String,

        /// Target video length in seconds.
        #[arg(long)]
        duration: Option<u32>,

        /// Narration voice hint.
        #[arg(long)]
        voice: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("vidgen error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    match cli.command {
        Command::Run {
            topic,
            duration,
            voice,
        } => run_pipeline(settings, topic, duration, voice).await,
    }
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn run_pipeline(
    settings: Settings,
    topic: String,
    duration: Option<u32>,
    voice: Option<String>,
) -> anyhow::Result<()> {
    let store = Arc::new(ContentStore::new(&settings.paths.work_root));
    store
        .ensure_directories()
        .await
        .context("failed to create content directories")?;

    let engine: Arc<dyn WorkflowEngine> = Arc::new(
        HttpWorkflowEngine::new(&settings.engine, settings.services.request_timeout())
            .context("failed to build engine client")?,
    );
    let client = http_client(settings.services.request_timeout())
        .context("failed to build service client")?;
    let text = Arc::new(HttpTextGenerator::new(client.clone(), &settings.services));
    let image = Arc::new(HttpImageSynthesizer::new(client.clone(), &settings.services));
    let tts = Arc::new(HttpSpeechSynthesizer::new(client, &settings.services));

    let mut runtime = WorkerRuntime::new(Arc::clone(&engine), &settings.engine.worker_id);
    runtime.register(Arc::new(ScriptWorker::new(
        text,
        settings.video.default_duration,
    )));
    runtime.register(Arc::new(ImageWorker::new(
        image,
        Arc::clone(&store),
        &settings.video,
    )));
    runtime.register(Arc::new(AudioWorker::new(tts, Arc::clone(&store))));
    runtime.register(Arc::new(AssembleWorker::new(
        Arc::clone(&store),
        settings.video.width,
        settings.video.height,
        settings.video.fps,
    )));
    runtime.start();

    let orchestrator = Arc::new(
        Orchestrator::new(
            Arc::new(RunRegistry::new()),
            Arc::clone(&engine),
            store,
            settings.engine.workflow_name.clone(),
            settings.engine.workflow_version,
        )
        .with_timing(settings.monitor.poll_interval(), settings.monitor.max_wait()),
    );

    let run_id = orchestrator.launch(RunRequest {
        topic,
        duration: duration.or(Some(settings.video.default_duration)),
        voice,
    });
    info!(%run_id, "started run");

    let run = watch_run(&orchestrator, &run_id).await?;
    runtime.stop();

    info!(%run_id, status = %run.status, "run finished");
    match run.status {
        RunStatus::Completed => {
            for artifact in &run.artifacts {
                info!(artifact = %artifact, "collected artifact");
            }
            Ok(())
        }
        status => bail!("run ended in {status}"),
    }
}

/// Poll the registry until the run goes terminal, logging step
/// transitions as they appear.
async fn watch_run(
    orchestrator: &Orchestrator,
    run_id: &str,
) -> anyhow::Result<vidgen_core::models::Run> {
    let mut printed: BTreeMap<StepName, String> = BTreeMap::new();
    loop {
        let run = orchestrator
            .registry()
            .get(run_id)
            .context("run disappeared from registry")?;

        for (step, status) in &run.steps {
            if printed.get(step) != Some(status) {
                info!(step = %step, status = %status, "step transition");
                printed.insert(*step, status.clone());
            }
        }

        if run.status.is_terminal() {
            return Ok(run);
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
