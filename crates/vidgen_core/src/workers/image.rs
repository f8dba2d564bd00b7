//! Image stage: one image per scene from the synthesis service.
//!
//! Each scene's visual description is sanitized into a prompt and sent
//! through the retry policy. An exhausted retry leaves an error-tagged
//! record with no file path - there is no fallback image. A fixed
//! pacing delay between scenes bounds the request rate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::contract::{decode_input, StageWorker};
use super::{sanitize_prompt, WorkerError, WorkerResult};
use crate::config::VideoSettings;
use crate::models::{success_rate, ImageStats, SceneImage, Script, StepName};
use crate::retry::{Backoff, RetryPolicy};
use crate::services::ImageSynthesizer;
use crate::storage::ContentStore;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(2);
const SCENE_PACING: Duration = Duration::from_secs(1);
const PROMPT_MAX_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
struct ImagesInput {
    script: Script,
}

/// Output payload of the image stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagesOutput {
    pub images: Vec<SceneImage>,
    pub script: Script,
    pub statistics: ImageStats,
    pub message: String,
}

/// Worker for the `generate_images` task.
pub struct ImageWorker {
    image: Arc<dyn ImageSynthesizer>,
    store: Arc<ContentStore>,
    width: u32,
    height: u32,
    retry: RetryPolicy,
    pacing: Duration,
}

impl ImageWorker {
    pub fn new(
        image: Arc<dyn ImageSynthesizer>,
        store: Arc<ContentStore>,
        video: &VideoSettings,
    ) -> Self {
        Self {
            image,
            store,
            width: video.width,
            height: video.height,
            retry: RetryPolicy::new(MAX_ATTEMPTS, Backoff::Linear(BACKOFF_BASE)),
            pacing: SCENE_PACING,
        }
    }

    /// Override the retry schedule and scene pacing (tests use
    /// millisecond timings).
    pub fn with_timing(mut self, retry: RetryPolicy, pacing: Duration) -> Self {
        self.retry = retry;
        self.pacing = pacing;
        self
    }

    /// Generate and persist one scene's image, or record the failure.
    async fn generate_scene_image(&self, index: usize, prompt: &str, duration: u32) -> SceneImage {
        let filename = format!("scene_{}.jpg", index + 1);
        let generated = self
            .retry
            .run("generate image", || {
                self.image.synthesize(prompt, self.width, self.height)
            })
            .await;

        match generated {
            Ok(bytes) => {
                let filepath = self.store.temp_path(&filename);
                match self.store.save_bytes(&filepath, &bytes).await {
                    Ok(()) => {
                        tracing::info!(scene = index + 1, filename, "image saved");
                        SceneImage {
                            scene_index: index,
                            filename,
                            filepath: Some(filepath),
                            duration,
                            prompt: prompt.to_string(),
                            error: None,
                        }
                    }
                    Err(err) => {
                        tracing::error!(scene = index + 1, %err, "failed to persist image");
                        SceneImage {
                            scene_index: index,
                            filename: format!("placeholder_{}.jpg", index + 1),
                            filepath: None,
                            duration,
                            prompt: prompt.to_string(),
                            error: Some(format!("failed to persist image: {}", err)),
                        }
                    }
                }
            }
            Err(err) => {
                tracing::error!(scene = index + 1, %err, "image generation failed");
                SceneImage {
                    scene_index: index,
                    filename: format!("placeholder_{}.jpg", index + 1),
                    filepath: None,
                    duration,
                    prompt: prompt.to_string(),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

#[async_trait]
impl StageWorker for ImageWorker {
    fn task_def_name(&self) -> &str {
        StepName::GenerateImages.task_type()
    }

    async fn process(&self, input: &serde_json::Value) -> WorkerResult<serde_json::Value> {
        let ImagesInput { script } = decode_input(self.task_def_name(), input)?;
        if script.scenes.is_empty() {
            return Err(WorkerError::invalid_input(
                "Script with scenes is required for image generation",
            ));
        }
        tracing::info!(
            title = %script.title,
            scenes = script.scenes.len(),
            "generating images"
        );

        let total = script.scenes.len();
        let mut images = Vec::with_capacity(total);
        for (i, scene) in script.scenes.iter().enumerate() {
            let prompt = sanitize_prompt(&scene.visual_description, PROMPT_MAX_CHARS);
            images.push(self.generate_scene_image(i, &prompt, scene.duration).await);

            if i + 1 < total {
                tokio::time::sleep(self.pacing).await;
            }
        }

        let successful = images.iter().filter(|img| img.is_usable()).count();
        let failed = total - successful;
        let statistics = ImageStats {
            total_scenes: total,
            successful_images: successful,
            failed_images: failed,
            success_rate: success_rate(successful, total),
        };
        tracing::info!(successful, failed, total, "image generation finished");

        let output = ImagesOutput {
            images,
            message: format!("Generated {}/{} images successfully", successful, total),
            statistics,
            script,
        };
        serde_json::to_value(&output).map_err(|e| WorkerError::Output(e.to_string()))
    }
}
