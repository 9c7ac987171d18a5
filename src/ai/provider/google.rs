//! Google Generative AI Provider
//!
//! Adapter over the Gemini `generateContent` / `streamGenerateContent`
//! endpoints. The API key travels in the `x-goog-api-key` header so it never
//! shows up in request URLs or logs.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::sse::delta_stream;
use super::{
    ErrorClassifier, LlmError, ProviderAdapter, ProviderCompletion, ProviderConfig, TextStream,
    status_error,
};
use crate::constants::provider::GOOGLE;
use crate::types::Result;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Google Generative AI provider with secure API key handling
pub struct GoogleProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
    cost_per_1k_tokens: f64,
    client: reqwest::Client,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GoogleProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config.resolve_api_key("GOOGLE_API_KEY", "Google")?;
        let api_base = config.resolve_api_base(DEFAULT_API_BASE)?;
        let client = config.http_client()?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            cost_per_1k_tokens: config.cost_per_1k_tokens,
            client,
        })
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_base, self.model, method)
    }

    /// POST a prompt. Streaming requests pass no timeout: their body may
    /// legitimately outlive the request deadline.
    async fn post(
        &self,
        url: &str,
        prompt: &str,
        timeout: Option<Duration>,
    ) -> std::result::Result<reqwest::Response, LlmError> {
        let mut request = self.client.post(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, GOOGLE))?;

        if !response.status().is_success() {
            return Err(status_error(response, GOOGLE).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for GoogleProvider {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> std::result::Result<ProviderCompletion, LlmError> {
        info!("Generating with Google (model: {})", self.model);

        let response = self
            .post(&self.endpoint("generateContent"), prompt, Some(self.timeout))
            .await?;

        let body: GeminiResponse = response.json().await.map_err(|e| {
            LlmError::malformed(format!("Failed to parse Google response: {}", e)).provider(GOOGLE)
        })?;

        let text = body.text();
        if text.trim().is_empty() {
            return Err(LlmError::malformed("No content in Google response").provider(GOOGLE));
        }

        debug!("Received {} chars from Google", text.len());

        let usage = body.usage_metadata.unwrap_or_default();
        Ok(ProviderCompletion {
            text,
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        })
    }

    async fn generate_stream(&self, prompt: &str) -> std::result::Result<TextStream, LlmError> {
        debug!("Opening Google stream (model: {})", self.model);

        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.post(&url, prompt, None).await?;

        Ok(delta_stream(response, GOOGLE.to_string(), |data| {
            let chunk: GeminiResponse = serde_json::from_str(data)
                .map_err(|e| LlmError::malformed(format!("Invalid Google stream event: {}", e)))?;
            Ok(Some(chunk.text()))
        }))
    }

    fn name(&self) -> &str {
        GOOGLE
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn cost_per_1k_tokens(&self) -> f64 {
        self.cost_per_1k_tokens
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/models/{}", self.api_base, self.model))
            .timeout(self.timeout)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("Google API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("Google API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Google API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}
