//! The script artifact: the schema every downstream stage depends on.

use serde::{Deserialize, Serialize};

/// Generated video script.
///
/// Produced by the script stage (either from the generative-text
/// service or the deterministic fallback) and consumed by the image,
/// audio, and assembly stages. The shape is a contract: downstream
/// stages fail fast when `scenes` is missing or empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub title: String,
    /// Total video length in seconds.
    pub total_duration: u32,
    /// Ordered scenes covering the full duration.
    pub scenes: Vec<Scene>,
}

/// One scene of the script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Offset from the start of the video, in seconds.
    pub start_time: u32,
    /// Scene length in seconds.
    pub duration: u32,
    /// Narration text, consumed by the audio stage.
    pub text: String,
    /// Prompt material for the image stage.
    pub visual_description: String,
}

impl Script {
    /// Structural validation of the script contract.
    ///
    /// Checks: non-empty title, at least one scene, and every scene
    /// fitting inside the total duration.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("script title is empty".to_string());
        }
        if self.scenes.is_empty() {
            return Err("script has no scenes".to_string());
        }
        for (i, scene) in self.scenes.iter().enumerate() {
            if scene.start_time + scene.duration > self.total_duration {
                return Err(format!(
                    "scene {} ends at {}s, past total duration {}s",
                    i + 1,
                    scene.start_time + scene.duration,
                    self.total_duration
                ));
            }
        }
        Ok(())
    }
}
