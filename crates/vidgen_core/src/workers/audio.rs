//! Audio stage: narration audio per scene from the TTS service.
//!
//! Retries with linear backoff, then falls back to a persisted
//! placeholder descriptor so the stage always yields exactly one record
//! per scene - tagged real, placeholder, or errored. Durations for
//! anything without real audio are estimated from narration length.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::contract::{decode_input, StageWorker};
use super::{sanitize_prompt, WorkerError, WorkerResult};
use crate::models::{success_rate, AudioStats, SceneAudio, Script, StepName};
use crate::retry::{Backoff, RetryPolicy};
use crate::services::SpeechSynthesizer;
use crate::storage::ContentStore;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const SCENE_PACING: Duration = Duration::from_millis(500);
const TEXT_MAX_CHARS: usize = 200;

/// Speaking rate used to estimate durations: ~150 words per minute at
/// ~5 characters per word.
const CHARS_PER_SECOND: f64 = 12.5;
const MIN_DURATION_SECS: f64 = 2.0;

#[derive(Debug, Deserialize)]
struct AudioInput {
    script: Script,
    #[serde(default)]
    voice: Option<String>,
}

/// Output payload of the audio stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioOutput {
    pub audio_files: Vec<SceneAudio>,
    pub script: Script,
    pub statistics: AudioStats,
    pub message: String,
}

/// Descriptor persisted in place of real audio when TTS is unavailable.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceholderDescriptor<'a> {
    text: &'a str,
    duration: f64,
    timestamp: String,
    note: &'static str,
    original_filename: &'a str,
}

/// Worker for the `generate_audio` task.
pub struct AudioWorker {
    tts: Arc<dyn SpeechSynthesizer>,
    store: Arc<ContentStore>,
    retry: RetryPolicy,
    pacing: Duration,
}

impl AudioWorker {
    pub fn new(tts: Arc<dyn SpeechSynthesizer>, store: Arc<ContentStore>) -> Self {
        Self {
            tts,
            store,
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

    /// Generate one scene's audio record. Never fails: an exhausted
    /// retry falls back to a placeholder descriptor, and a failed
    /// placeholder write yields an error-tagged record.
    async fn generate_scene_audio(&self, index: usize, text: &str) -> SceneAudio {
        let filename = format!("audio_scene_{}.mp3", index + 1);
        let clean_text = sanitize_prompt(text, TEXT_MAX_CHARS);

        let result = self
            .retry
            .run_with_fallback(
                "generate audio",
                || self.synthesize_and_save(index, &clean_text, &filename),
                || self.write_placeholder(index, text, &filename),
            )
            .await;

        match result {
            Ok(record) => record,
            Err(err) => {
                tracing::error!(scene = index + 1, %err, "audio fallback failed");
                SceneAudio {
                    scene_index: index,
                    filename: format!("placeholder_audio_{}.mp3", index + 1),
                    filepath: None,
                    text: text.to_string(),
                    duration: estimate_duration(text),
                    is_placeholder: false,
                    is_real_audio: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Primary path: TTS call plus persisting the returned bytes.
    async fn synthesize_and_save(
        &self,
        index: usize,
        clean_text: &str,
        filename: &str,
    ) -> WorkerResult<SceneAudio> {
        let bytes = self.tts.synthesize(clean_text).await?;
        let filepath = self.store.temp_path(filename);
        self.store
            .save_bytes(&filepath, &bytes)
            .await
            .map_err(|e| WorkerError::io("save audio", e))?;

        tracing::info!(scene = index + 1, filename, size = bytes.len(), "real audio saved");
        Ok(SceneAudio {
            scene_index: index,
            filename: filename.to_string(),
            filepath: Some(filepath),
            text: clean_text.to_string(),
            duration: estimate_duration(clean_text),
            is_placeholder: false,
            is_real_audio: true,
            error: None,
        })
    }

    /// Fallback: persist a JSON-in-text descriptor carrying the
    /// narration and an estimated duration.
    async fn write_placeholder(
        &self,
        index: usize,
        text: &str,
        original_filename: &str,
    ) -> WorkerResult<SceneAudio> {
        let filename = format!("placeholder_audio_{}.mp3", index + 1);
        let duration = estimate_duration(text);
        let descriptor = PlaceholderDescriptor {
            text,
            duration,
            timestamp: chrono::Utc::now().to_rfc3339(),
            note: "TTS service unavailable. This is a text placeholder.",
            original_filename,
        };
        let body = serde_json::to_string_pretty(&descriptor)
            .map_err(|e| WorkerError::Output(e.to_string()))?;

        let filepath = self.store.temp_path(&filename);
        self.store
            .save_text(&filepath, &body)
            .await
            .map_err(|e| WorkerError::io("save audio placeholder", e))?;

        tracing::info!(scene = index + 1, filename, "audio placeholder created");
        Ok(SceneAudio {
            scene_index: index,
            filename,
            filepath: Some(filepath),
            text: text.to_string(),
            duration,
            is_placeholder: true,
            is_real_audio: false,
            error: None,
        })
    }
}

#[async_trait]
impl StageWorker for AudioWorker {
    fn task_def_name(&self) -> &str {
        StepName::GenerateAudio.task_type()
    }

    async fn process(&self, input: &serde_json::Value) -> WorkerResult<serde_json::Value> {
        let AudioInput { script, voice } = decode_input(self.task_def_name(), input)?;
        if script.scenes.is_empty() {
            return Err(WorkerError::invalid_input(
                "Script with scenes is required for audio generation",
            ));
        }
        if let Some(voice) = &voice {
            tracing::debug!(voice, "voice requested");
        }
        tracing::info!(
            title = %script.title,
            scenes = script.scenes.len(),
            "generating audio"
        );

        let total = script.scenes.len();
        let mut audio_files = Vec::with_capacity(total);
        for (i, scene) in script.scenes.iter().enumerate() {
            audio_files.push(self.generate_scene_audio(i, &scene.text).await);

            if i + 1 < total {
                tokio::time::sleep(self.pacing).await;
            }
        }

        let successful = audio_files.iter().filter(|a| a.is_real_audio).count();
        let placeholders = audio_files.iter().filter(|a| a.is_placeholder).count();
        let failed = audio_files.iter().filter(|a| a.error.is_some()).count();
        let statistics = AudioStats {
            total_scenes: total,
            successful_audio: successful,
            placeholder_audio: placeholders,
            failed_audio: failed,
            success_rate: success_rate(successful, total),
        };
        tracing::info!(successful, placeholders, failed, total, "audio generation finished");

        let output = AudioOutput {
            message: format!(
                "Generated audio for {}/{} scenes ({} placeholders)",
                successful, total, placeholders
            ),
            audio_files,
            statistics,
            script,
        };
        serde_json::to_value(&output).map_err(|e| WorkerError::Output(e.to_string()))
    }
}

/// Estimate narration duration from text length, floored to a minimum
/// and rounded to one decimal.
fn estimate_duration(text: &str) -> f64 {
    let duration = (text.chars().count() as f64 / CHARS_PER_SECOND).max(MIN_DURATION_SECS);
    (duration * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ServiceError, ServiceResult};
    use crate::workers::script::fallback_script;
    use serde_json::json;

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

    fn worker(store: Arc<ContentStore>, fail: bool) -> AudioWorker {
        AudioWorker::new(Arc::new(StubTts { fail }), store).with_timing(
            RetryPolicy::new(2, Backoff::Fixed(Duration::from_millis(1))),
            Duration::from_millis(1),
        )
    }

    fn input() -> serde_json::Value {
        json!({ "script": fallback_script("comets", 9) })
    }

    #[tokio::test]
    async fn real_audio_for_every_scene_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ContentStore::new(dir.path()));
        let output = worker(store.clone(), false).process(&input()).await.unwrap();
        let output: AudioOutput = serde_json::from_value(output).unwrap();

        assert_eq!(output.audio_files.len(), 3);
        assert_eq!(output.statistics.success_rate, 100);
        for (i, audio) in output.audio_files.iter().enumerate() {
            assert_eq!(audio.scene_index, i);
            assert!(audio.is_real_audio);
            assert!(!audio.is_placeholder);
            assert!(store.exists(audio.filepath.as_ref().unwrap()));
        }
    }

    #[tokio::test]
    async fn tts_outage_yields_one_placeholder_per_scene() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ContentStore::new(dir.path()));
        let output = worker(store.clone(), true).process(&input()).await.unwrap();
        let output: AudioOutput = serde_json::from_value(output).unwrap();

        // Exactly one record per scene, all placeholder-tagged.
        assert_eq!(output.audio_files.len(), 3);
        assert_eq!(output.statistics.successful_audio, 0);
        assert_eq!(output.statistics.placeholder_audio, 3);
        assert_eq!(output.statistics.success_rate, 0);
        for audio in &output.audio_files {
            assert!(audio.is_placeholder);
            assert!(!audio.is_real_audio);
            assert!(audio.duration >= MIN_DURATION_SECS);
            // The descriptor is a real persisted file containing JSON.
            let path = audio.filepath.as_ref().unwrap();
            assert!(path.contains("placeholder_audio_"));
            let body = std::fs::read_to_string(store.resolve(path)).unwrap();
            let descriptor: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(descriptor["text"].as_str().unwrap(), audio.text);
        }
    }

    #[tokio::test]
    async fn missing_script_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ContentStore::new(dir.path()));
        let err = worker(store, false).process(&json!({})).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidInput(_)));
    }

    #[test]
    fn duration_estimate_floors_and_rounds() {
        assert_eq!(estimate_duration(""), 2.0);
        assert_eq!(estimate_duration("short"), 2.0);
        // 100 chars / 12.5 = 8.0
        assert_eq!(estimate_duration(&"a".repeat(100)), 8.0);
        // 47 chars / 12.5 = 3.76 -> 3.8
        assert_eq!(estimate_duration(&"a".repeat(47)), 3.8);
    }
}
