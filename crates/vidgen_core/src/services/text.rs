//! Generative-text completion client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ServiceError, ServiceResult, TextGenerator};
use crate::config::ServiceSettings;

const SERVICE: &str = "text generation";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    generations: Vec<Generation>,
}

#[derive(Deserialize)]
struct Generation {
    text: String,
}

/// HTTP client for a completion-style text generation API.
pub struct HttpTextGenerator {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpTextGenerator {
    pub fn new(client: Client, settings: &ServiceSettings) -> Self {
        Self {
            client,
            url: settings.text_url.clone(),
            api_key: settings.text_api_key.clone(),
            model: settings.text_model.clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> ServiceResult<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            max_tokens,
            temperature,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(ServiceError::http_status(
                SERVICE,
                response.status().as_u16(),
            ));
        }

        let decoded: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::decode(SERVICE, e.to_string()))?;

        decoded
            .generations
            .into_iter()
            .next()
            .map(|g| g.text)
            .ok_or_else(|| ServiceError::decode(SERVICE, "response contained no generations"))
    }
}
