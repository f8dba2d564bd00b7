//! Image synthesis client.
//!
//! The prompt rides in the URL path, so it is percent-encoded via the
//! URL type rather than string concatenation.

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::{ImageSynthesizer, ServiceError, ServiceResult};
use crate::config::ServiceSettings;

const SERVICE: &str = "image synthesis";

/// HTTP client for a prompt-in-URL image synthesis API.
pub struct HttpImageSynthesizer {
    client: Client,
    base_url: String,
}

impl HttpImageSynthesizer {
    pub fn new(client: Client, settings: &ServiceSettings) -> Self {
        Self {
            client,
            base_url: settings.image_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_url(&self, prompt: &str, width: u32, height: u32) -> ServiceResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ServiceError::bad_request(SERVICE, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::bad_request(SERVICE, "image URL cannot be a base"))?
            .push(prompt);
        url.query_pairs_mut()
            .append_pair("width", &width.to_string())
            .append_pair("height", &height.to_string())
            .append_pair("nologo", "true");
        Ok(url)
    }
}

#[async_trait]
impl ImageSynthesizer for HttpImageSynthesizer {
    async fn synthesize(&self, prompt: &str, width: u32, height: u32) -> ServiceResult<Vec<u8>> {
        let url = self.build_url(prompt, width, height)?;
        tracing::debug!(%url, "requesting image");

        let response = self
            .client
            .get(url)
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
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn synthesizer() -> HttpImageSynthesizer {
        let settings = ServiceSettings {
            image_url: "https://image.example.com/prompt".to_string(),
            ..ServiceSettings::default()
        };
        let client = crate::services::http_client(Duration::from_secs(30)).unwrap();
        HttpImageSynthesizer::new(client, &settings)
    }

    #[test]
    fn prompt_is_percent_encoded_into_path() {
        let url = synthesizer()
            .build_url("A sunset over mountains, vivid!", 1024, 576)
            .unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://image.example.com/prompt/A%20sunset"));
        assert!(s.contains("width=1024"));
        assert!(s.contains("height=576"));
        assert!(s.contains("nologo=true"));
    }
}
