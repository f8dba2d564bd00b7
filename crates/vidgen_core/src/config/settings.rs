//! Settings struct with TOML-based sections.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Workflow engine connection.
    #[serde(default)]
    pub engine: EngineSettings,

    /// External content service endpoints.
    #[serde(default)]
    pub services: ServiceSettings,

    /// Video output parameters.
    #[serde(default)]
    pub video: VideoSettings,

    /// Content directory layout.
    #[serde(default)]
    pub paths: PathSettings,

    /// Workflow status monitoring.
    #[serde(default)]
    pub monitor: MonitorSettings,
}

impl Settings {
    /// Load settings from a TOML file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Persist settings as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

/// Workflow engine connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Base URL of the engine's REST API.
    #[serde(default = "default_engine_url")]
    pub server_url: String,

    /// Optional auth token sent as `X-Authorization`.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Name of the workflow definition to start per run.
    #[serde(default = "default_workflow_name")]
    pub workflow_name: String,

    /// Version of the workflow definition.
    #[serde(default = "default_workflow_version")]
    pub workflow_version: i32,

    /// Worker identifier reported when polling for tasks.
    #[serde(default = "default_worker_id")]
    pub worker_id: String,
}

fn default_engine_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_workflow_name() -> String {
    "video_generation_workflow".to_string()
}

fn default_workflow_version() -> i32 {
    1
}

fn default_worker_id() -> String {
    "vidgen-worker".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            server_url: default_engine_url(),
            auth_token: None,
            workflow_name: default_workflow_name(),
            workflow_version: default_workflow_version(),
            worker_id: default_worker_id(),
        }
    }
}

/// External content service endpoints and client behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Generative-text completion endpoint.
    #[serde(default = "default_text_url")]
    pub text_url: String,

    /// API key for the text service (bearer token).
    #[serde(default)]
    pub text_api_key: Option<String>,

    /// Model name sent with text completion requests.
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Image synthesis endpoint; the prompt is appended as a path segment.
    #[serde(default = "default_image_url")]
    pub image_url: String,

    /// Text-to-speech endpoint.
    #[serde(default = "default_tts_url")]
    pub tts_url: String,

    /// Per-request timeout for all three services, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_text_url() -> String {
    "https://api.cohere.com/v1/generate".to_string()
}

fn default_text_model() -> String {
    "command-r-plus".to_string()
}

fn default_image_url() -> String {
    "https://image.pollinations.ai/prompt".to_string()
}

fn default_tts_url() -> String {
    "https://translate.google.com/translate_tts".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            text_url: default_text_url(),
            text_api_key: None,
            text_model: default_text_model(),
            image_url: default_image_url(),
            tts_url: default_tts_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServiceSettings {
    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Video output parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSettings {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Duration used when a run request does not specify one.
    #[serde(default = "default_duration")]
    pub default_duration: u32,
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    576
}

fn default_fps() -> u32 {
    30
}

fn default_duration() -> u32 {
    30
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            default_duration: default_duration(),
        }
    }
}

/// Content directory layout, relative to the working root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Working root the temp/output directories live under.
    #[serde(default = "default_work_root")]
    pub work_root: String,
}

fn default_work_root() -> String {
    ".".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_root: default_work_root(),
        }
    }
}

/// Workflow status monitoring cadence and ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Seconds between status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Overall wall-clock ceiling per run, in seconds.
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_wait() -> u64 {
    600
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_wait_secs: default_max_wait(),
        }
    }
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}
