//! Per-scene image/audio records and stage statistics.

use serde::{Deserialize, Serialize};

/// Image stage result for one scene.
///
/// `filepath` is present only when an image was actually generated and
/// persisted; an exhausted retry leaves `filepath` empty and `error`
/// set - there is no fallback image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneImage {
    pub scene_index: usize,
    pub filename: String,
    pub filepath: Option<String>,
    /// Scene duration carried through for assembly.
    pub duration: u32,
    /// Sanitized prompt the image was generated from.
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SceneImage {
    /// Whether this record carries a usable file reference.
    pub fn is_usable(&self) -> bool {
        self.filepath.is_some() && self.error.is_none()
    }
}

/// Audio stage result for one scene.
///
/// The audio stage always emits exactly one record per scene, tagged as
/// real audio, placeholder, or errored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneAudio {
    pub scene_index: usize,
    pub filename: String,
    pub filepath: Option<String>,
    /// Narration text the audio was generated from.
    pub text: String,
    /// Real or estimated duration in seconds.
    pub duration: f64,
    #[serde(default)]
    pub is_placeholder: bool,
    #[serde(default)]
    pub is_real_audio: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SceneAudio {
    /// Whether this record carries usable real audio. Placeholder
    /// descriptors have a filepath but are not playable audio.
    pub fn is_usable(&self) -> bool {
        self.filepath.is_some() && self.error.is_none() && self.is_real_audio
    }
}

/// Aggregate outcome of the image stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStats {
    pub total_scenes: usize,
    pub successful_images: usize,
    pub failed_images: usize,
    /// Integer percentage, rounded to nearest.
    pub success_rate: u32,
}

/// Aggregate outcome of the audio stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStats {
    pub total_scenes: usize,
    pub successful_audio: usize,
    pub placeholder_audio: usize,
    pub failed_audio: usize,
    /// Integer percentage, rounded to nearest.
    pub success_rate: u32,
}

/// Completeness statistics recorded by the assembly stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyStats {
    pub total_scenes: usize,
    pub scenes_with_images: usize,
    pub scenes_with_audio: usize,
    pub placeholder_audio: usize,
}

/// Rounded integer success percentage (`successful / total * 100`).
pub(crate) fn success_rate(successful: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (successful as f64 / total as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_rounds_to_nearest() {
        assert_eq!(success_rate(0, 3), 0);
        assert_eq!(success_rate(1, 3), 33);
        assert_eq!(success_rate(2, 3), 67);
        assert_eq!(success_rate(3, 3), 100);
        assert_eq!(success_rate(0, 0), 0);
    }

    #[test]
    fn usable_requires_path_and_no_error() {
        let mut img = SceneImage {
            scene_index: 0,
            filename: "scene_1.jpg".to_string(),
            filepath: Some("temp/scene_1.jpg".to_string()),
            duration: 5,
            prompt: "p".to_string(),
            error: None,
        };
        assert!(img.is_usable());
        img.error = Some("HTTP 500".to_string());
        assert!(!img.is_usable());
        img.error = None;
        img.filepath = None;
        assert!(!img.is_usable());
    }

    #[test]
    fn placeholder_audio_is_not_usable() {
        let mut audio = SceneAudio {
            scene_index: 0,
            filename: "placeholder_audio_1.mp3".to_string(),
            filepath: Some("temp/placeholder_audio_1.mp3".to_string()),
            text: "t".to_string(),
            duration: 2.0,
            is_placeholder: true,
            is_real_audio: false,
            error: None,
        };
        assert!(!audio.is_usable());
        audio.is_placeholder = false;
        audio.is_real_audio = true;
        assert!(audio.is_usable());
    }
}
