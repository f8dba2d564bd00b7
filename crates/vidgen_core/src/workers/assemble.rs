//! Assembly stage: join the script with the per-scene image and audio
//! records into a final project description.
//!
//! No media rendering happens here. The stage matches records to scenes
//! by position, tags each scene with what it actually has, and persists
//! a project JSON plus an HTML preview under `output/`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::contract::{decode_input, StageWorker};
use super::{WorkerError, WorkerResult};
use crate::models::{AssemblyStats, SceneAudio, SceneImage, Script, StepName};
use crate::storage::ContentStore;

const PROJECT_FILENAME: &str = "video_project.json";
const PREVIEW_FILENAME: &str = "video_preview.html";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssembleInput {
    script: Script,
    images: Vec<SceneImage>,
    audio_files: Vec<SceneAudio>,
}

/// One scene of the assembled project, with whatever media made it
/// through the earlier stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectScene {
    pub scene_number: usize,
    pub start_time: u32,
    pub duration: u32,
    pub text: String,
    pub visual_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    pub has_image: bool,
    pub has_audio: bool,
    pub is_placeholder_audio: bool,
}

/// The assembled project description persisted as
/// `output/video_project.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoProject {
    pub title: String,
    pub total_duration: u32,
    pub resolution: String,
    pub fps: u32,
    pub created_at: String,
    pub scenes: Vec<ProjectScene>,
    pub statistics: AssemblyStats,
}

/// Output payload of the assembly stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembleOutput {
    pub video_path: String,
    pub preview_path: String,
    pub video_data: VideoProject,
    pub message: String,
}

/// Worker for the `assemble_video` task.
pub struct AssembleWorker {
    store: Arc<ContentStore>,
    width: u32,
    height: u32,
    fps: u32,
}

impl AssembleWorker {
    pub fn new(store: Arc<ContentStore>, width: u32, height: u32, fps: u32) -> Self {
        Self {
            store,
            width,
            height,
            fps,
        }
    }

    /// Join stage records to scenes by position. A scene past the end
    /// of a record list simply has no media of that kind.
    fn build_project(
        &self,
        script: &Script,
        images: &[SceneImage],
        audio_files: &[SceneAudio],
    ) -> VideoProject {
        let mut scenes = Vec::with_capacity(script.scenes.len());
        for (i, scene) in script.scenes.iter().enumerate() {
            let image = images.get(i).filter(|r| r.is_usable());
            let audio_record = audio_files.get(i);
            let audio = audio_record.filter(|r| r.is_usable());
            scenes.push(ProjectScene {
                scene_number: i + 1,
                start_time: scene.start_time,
                duration: scene.duration,
                text: scene.text.clone(),
                visual_description: scene.visual_description.clone(),
                image_file: image.and_then(|r| r.filepath.clone()),
                audio_file: audio.and_then(|r| r.filepath.clone()),
                has_image: image.is_some(),
                has_audio: audio.is_some(),
                is_placeholder_audio: audio_record.map(|r| r.is_placeholder).unwrap_or(false),
            });
        }

        let statistics = AssemblyStats {
            total_scenes: scenes.len(),
            scenes_with_images: scenes.iter().filter(|s| s.has_image).count(),
            scenes_with_audio: scenes.iter().filter(|s| s.has_audio).count(),
            placeholder_audio: scenes.iter().filter(|s| s.is_placeholder_audio).count(),
        };

        VideoProject {
            title: script.title.clone(),
            total_duration: script.total_duration,
            resolution: format!("{}x{}", self.width, self.height),
            fps: self.fps,
            created_at: chrono::Utc::now().to_rfc3339(),
            scenes,
            statistics,
        }
    }

    fn render_preview(&self, project: &VideoProject) -> String {
        let mut rows = String::new();
        for scene in &project.scenes {
            rows.push_str(&format!(
                "    <div class=\"scene\">\n      <h3>Scene {} ({}s - {}s)</h3>\n      \
                 <p>{}</p>\n      <p class=\"media\">image: {} | audio: {}</p>\n    </div>\n",
                scene.scene_number,
                scene.start_time,
                scene.start_time + scene.duration,
                scene.text,
                scene.image_file.as_deref().unwrap_or("(none)"),
                scene.audio_file.as_deref().unwrap_or("(none)"),
            ));
        }
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n  \
             <title>{title}</title>\n  <style>\n    body {{ font-family: sans-serif; \
             max-width: 720px; margin: 2em auto; }}\n    .scene {{ border: 1px solid #ccc; \
             padding: 1em; margin-bottom: 1em; }}\n    .media {{ color: #666; \
             font-size: 0.9em; }}\n  </style>\n</head>\n<body>\n  <h1>{title}</h1>\n  \
             <p>{duration}s | {resolution} @ {fps}fps</p>\n  <div id=\"scenes\">\n{rows}  \
             </div>\n</body>\n</html>\n",
            title = project.title,
            duration = project.total_duration,
            resolution = project.resolution,
            fps = project.fps,
            rows = rows,
        )
    }
}

#[async_trait]
impl StageWorker for AssembleWorker {
    fn task_def_name(&self) -> &str {
        StepName::AssembleVideo.task_type()
    }

    async fn process(&self, input: &serde_json::Value) -> WorkerResult<serde_json::Value> {
        let AssembleInput {
            script,
            images,
            audio_files,
        } = decode_input(self.task_def_name(), input)?;
        if script.scenes.is_empty() {
            return Err(WorkerError::invalid_input(
                "Script with scenes is required for assembly",
            ));
        }
        tracing::info!(
            title = %script.title,
            scenes = script.scenes.len(),
            images = images.len(),
            audio = audio_files.len(),
            "assembling project"
        );

        let project = self.build_project(&script, &images, &audio_files);

        let video_path = self.store.output_path(PROJECT_FILENAME);
        let body = serde_json::to_string_pretty(&project)
            .map_err(|e| WorkerError::Output(e.to_string()))?;
        self.store
            .save_text(&video_path, &body)
            .await
            .map_err(|e| WorkerError::io("save project", e))?;

        let preview_path = self.store.output_path(PREVIEW_FILENAME);
        self.store
            .save_text(&preview_path, &self.render_preview(&project))
            .await
            .map_err(|e| WorkerError::io("save preview", e))?;

        tracing::info!(
            video_path,
            preview_path,
            with_images = project.statistics.scenes_with_images,
            with_audio = project.statistics.scenes_with_audio,
            "assembly finished"
        );

        let output = AssembleOutput {
            message: format!(
                "Assembled {} scenes ({} with images, {} with audio)",
                project.statistics.total_scenes,
                project.statistics.scenes_with_images,
                project.statistics.scenes_with_audio
            ),
            video_path,
            preview_path,
            video_data: project,
        };
        serde_json::to_value(&output).map_err(|e| WorkerError::Output(e.to_string()))
    }
}
