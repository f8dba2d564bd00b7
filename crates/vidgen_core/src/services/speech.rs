//! Text-to-speech client.

use async_trait::async_trait;
use reqwest::Client;

use super::{ServiceError, ServiceResult, SpeechSynthesizer};
use crate::config::ServiceSettings;

const SERVICE: &str = "text-to-speech";

/// HTTP client for a simple query-parameter TTS API.
pub struct HttpSpeechSynthesizer {
    client: Client,
    url: String,
}

impl HttpSpeechSynthesizer {
    pub fn new(client: Client, settings: &ServiceSettings) -> Self {
        Self {
            client,
            url: settings.tts_url.clone(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> ServiceResult<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", "en"),
                ("client", "tw-ob"),
            ])
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(ServiceError::http_status(
                SERVICE,
                response.status().as_u16(),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        tracing::debug!(size = bytes.len(), "received audio bytes");
        Ok(bytes.to_vec())
    }
}
