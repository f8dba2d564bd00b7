//! External content service clients.
//!
//! Three thin request/response HTTP clients behind traits: generative
//! text, image synthesis, and text-to-speech. Stage workers depend only
//! on the traits so tests can substitute deterministic mocks. All
//! production clients share a bounded timeout and a custom client
//! identifier header.

mod image;
mod speech;
mod text;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use image::HttpImageSynthesizer;
pub use speech::HttpSpeechSynthesizer;
pub use text::HttpTextGenerator;

/// Client identifier sent with every outbound request, engine and
/// content services alike.
pub(crate) const CLIENT_ID: &str = concat!("vidgen/", env!("CARGO_PKG_VERSION"));

/// Errors from content service calls.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}")]
    HttpStatus { service: &'static str, status: u16 },

    #[error("Failed to decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("Invalid {service} request: {message}")]
    BadRequest {
        service: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn transport(service: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { service, source }
    }

    pub fn http_status(service: &'static str, status: u16) -> Self {
        Self::HttpStatus { service, status }
    }

    pub fn decode(service: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            service,
            message: message.into(),
        }
    }

    pub fn bad_request(service: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            service,
            message: message.into(),
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Generative-text completion service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt with the given sampling parameters.
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f64)
        -> ServiceResult<String>;
}

/// Image synthesis service.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// Generate an image for a prompt at the target dimensions,
    /// returning raw image bytes.
    async fn synthesize(&self, prompt: &str, width: u32, height: u32) -> ServiceResult<Vec<u8>>;
}

/// Text-to-speech service.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech for the text, returning raw audio bytes.
    async fn synthesize(&self, text: &str) -> ServiceResult<Vec<u8>>;
}

/// Shared HTTP client for the content services.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(CLIENT_ID)
        .build()
}
