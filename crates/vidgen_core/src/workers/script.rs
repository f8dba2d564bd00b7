//! Script stage: generate the video script from a topic.
//!
//! Primary path asks the generative-text service for strict JSON and
//! parses it as the script schema. Any failure on that path - the call
//! itself or the parse - falls through unconditionally to the
//! deterministic fallback generator; parse failures are treated as
//! deterministic, not transient, so there is no retry here. The stage
//! always returns a usable script.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::contract::{decode_input, StageWorker};
use super::{WorkerError, WorkerResult};
use crate::models::{Scene, Script, StepName};
use crate::services::TextGenerator;

const MAX_TOKENS: u32 = 2048;
const TEMPERATURE: f64 = 0.7;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptInput {
    topic: String,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    voice: Option<String>,
}

/// Output payload of the script stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOutput {
    pub script: Script,
    pub topic: String,
    pub duration: u32,
    pub scenes_count: usize,
    pub message: String,
}

/// Worker for the `generate_script` task.
pub struct ScriptWorker {
    text: Arc<dyn TextGenerator>,
    default_duration: u32,
}

impl ScriptWorker {
    pub fn new(text: Arc<dyn TextGenerator>, default_duration: u32) -> Self {
        Self {
            text,
            default_duration,
        }
    }

    /// Ask the text service for a JSON-shaped script and parse it.
    async fn generate_script(&self, topic: &str, duration: u32) -> WorkerResult<Script> {
        let prompt = build_prompt(topic, duration);
        let raw = self.text.generate(&prompt, MAX_TOKENS, TEMPERATURE).await?;
        parse_script(&raw)
    }
}

#[async_trait]
impl StageWorker for ScriptWorker {
    fn task_def_name(&self) -> &str {
        StepName::GenerateScript.task_type()
    }

    async fn process(&self, input: &serde_json::Value) -> WorkerResult<serde_json::Value> {
        let input: ScriptInput = decode_input(self.task_def_name(), input)?;
        if input.topic.trim().is_empty() {
            return Err(WorkerError::invalid_input(
                "Topic is required for script generation",
            ));
        }
        let topic = input.topic.trim();
        let duration = input.duration.unwrap_or(self.default_duration).max(1);
        if let Some(voice) = &input.voice {
            tracing::debug!(voice, "voice requested");
        }
        tracing::info!(topic, duration, "generating script");

        let (script, message) = match self.generate_script(topic, duration).await {
            Ok(script) => {
                tracing::info!(title = %script.title, scenes = script.scenes.len(), "script generated");
                let message = format!("Successfully generated script: '{}'", script.title);
                (script, message)
            }
            Err(err) => {
                // Not retried: service faults and parse faults alike fall
                // through to the deterministic generator.
                tracing::warn!(%err, "script generation failed, using fallback generator");
                let script = fallback_script(topic, duration);
                let message = format!("Generated fallback script: '{}'", script.title);
                (script, message)
            }
        };

        let output = ScriptOutput {
            topic: topic.to_string(),
            duration,
            scenes_count: script.scenes.len(),
            message,
            script,
        };
        serde_json::to_value(&output).map_err(|e| WorkerError::Output(e.to_string()))
    }
}

fn build_prompt(topic: &str, duration: u32) -> String {
    format!(
        r#"Create a {duration}-second engaging video script about "{topic}".

Requirements:
- Hook viewers in the first 3 seconds
- Clear, concise content for {duration} seconds total
- Call to action at the end
- Break into scenes with timestamps
- Include a visual description for each scene

Return ONLY valid JSON in this exact format:
{{
  "title": "Video Title",
  "totalDuration": {duration},
  "scenes": [
    {{
      "startTime": 0,
      "duration": 5,
      "text": "Narration text",
      "visualDescription": "Detailed visual description for image generation"
    }}
  ]
}}"#
    )
}

/// Parse a service response as the script schema. Markdown code fences
/// around the JSON are tolerated.
fn parse_script(raw: &str) -> WorkerResult<Script> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let script: Script = serde_json::from_str(cleaned.trim())
        .map_err(|e| WorkerError::invalid_input(format!("script response is not valid JSON: {}", e)))?;
    script.validate().map_err(WorkerError::InvalidInput)?;
    Ok(script)
}

/// Deterministic script generator used when the service path fails.
///
/// Splits the duration across 2-5 scenes (duration / 3, clamped), with
/// the last scene absorbing any remainder so scene durations sum to the
/// total.
pub(crate) fn fallback_script(topic: &str, duration: u32) -> Script {
    let num_scenes = (duration / 3).clamp(2, 5);
    let scene_duration = (duration / num_scenes).max(1);

    let scenes = (0..num_scenes)
        .map(|i| {
            let start_time = (i * scene_duration).min(duration);
            let is_first = i == 0;
            let is_last = i == num_scenes - 1;

            let (text, visual_description) = if is_first {
                (
                    format!(
                        "Welcome! Today we're exploring {}. Get ready for an amazing journey!",
                        topic
                    ),
                    format!(
                        "Engaging opening scene with vibrant colors, showing {} in an exciting way",
                        topic
                    ),
                )
            } else if is_last {
                (
                    format!(
                        "Thanks for watching! Don't forget to like and subscribe for more content about {}!",
                        topic
                    ),
                    format!(
                        "Call to action scene with subscribe button and social media icons, {} themed background",
                        topic
                    ),
                )
            } else {
                (
                    format!(
                        "Let's dive deeper into {} and discover what makes it so fascinating and important.",
                        topic
                    ),
                    format!(
                        "Educational scene showing detailed aspects of {} with infographics and visual elements",
                        topic
                    ),
                )
            };

            Scene {
                start_time,
                duration: if is_last {
                    duration - start_time
                } else {
                    scene_duration
                },
                text,
                visual_description,
            }
        })
        .collect();

    Script {
        title: format!("{}: A Complete Guide", topic),
        total_duration: duration,
        scenes,
    }
}
