//! OpenAI API Provider
//!
//! Adapter over the Chat Completions API, single-shot and `stream: true`.

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
use crate::constants::provider::OPENAI;
use crate::types::Result;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

const SYSTEM_PROMPT: &str = "You are a UK compliance specialist who drafts clear, accurate \
organisational policies in Markdown. Respond with the policy document only.";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
    cost_per_1k_tokens: f64,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config.resolve_api_key("OPENAI_API_KEY", "OpenAI")?;
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

    fn build_request(&self, prompt: &str, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            stream,
        }
    }

    async fn post(
        &self,
        prompt: &str,
        stream: bool,
    ) -> std::result::Result<reqwest::Response, LlmError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.api_base));
        if !stream {
            request = request.timeout(self.timeout);
        }

        let response = request
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.build_request(prompt, stream))
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, OPENAI))?;

        if !response.status().is_success() {
            return Err(status_error(response, OPENAI).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> std::result::Result<ProviderCompletion, LlmError> {
        info!(
            "Generating with OpenAI (model: {}, temperature: {})",
            self.model, self.temperature
        );

        let response = self.post(prompt, false).await?;

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            LlmError::malformed(format!("Failed to parse OpenAI response: {}", e)).provider(OPENAI)
        })?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::malformed("No content in OpenAI response").provider(OPENAI))?;

        debug!("Received {} chars from OpenAI", text.len());

        Ok(ProviderCompletion {
            text,
            input_tokens: body.usage.as_ref().map(|u| u.prompt_tokens),
            output_tokens: body.usage.as_ref().map(|u| u.completion_tokens),
        })
    }

    async fn generate_stream(&self, prompt: &str) -> std::result::Result<TextStream, LlmError> {
        debug!("Opening OpenAI stream (model: {})", self.model);

        let response = self.post(prompt, true).await?;

        Ok(delta_stream(response, OPENAI.to_string(), |data| {
            let chunk: ChatStreamChunk = serde_json::from_str(data)
                .map_err(|e| LlmError::malformed(format!("Invalid OpenAI stream event: {}", e)))?;
            Ok(chunk.choices.into_iter().next().and_then(|c| c.delta.content))
        }))
    }

    fn name(&self) -> &str {
        OPENAI
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
            .get(format!("{}/models", self.api_base))
            .timeout(self.timeout)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("OpenAI API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("OpenAI API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(ProviderConfig {
            model: Some("gpt-test".to_string()),
            api_key: Some("sk-test".to_string()),
            api_base: Some(format!("{}/v1/", server.uri())),
            timeout_secs: 5,
            ..ProviderConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "# Data Protection Policy"}}],
                "usage": {"prompt_tokens": 90, "completion_tokens": 30}
            })))
            .mount(&server)
            .await;

        let completion = provider(&server).generate("draft").await.unwrap();
        assert_eq!(completion.text, "# Data Protection Policy");
        assert_eq!(completion.input_tokens, Some(90));
        assert_eq!(completion.output_tokens, Some(30));
    }

    #[tokio::test]
    async fn test_generate_maps_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider(&server).generate("draft").await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Transient);
        assert!(err.message.contains("overloaded"));
    }

    #[tokio::test]
    async fn test_stream_stops_at_done_sentinel() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let stream = provider(&server).generate_stream("draft").await.unwrap();
        let deltas: Vec<String> = stream.map(|d| d.unwrap()).collect().await;
        assert_eq!(deltas, vec!["Hello".to_string(), " world".to_string()]);
    }

    #[tokio::test]
    async fn test_stream_surfaces_malformed_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: {oops\n\n"),
            )
            .mount(&server)
            .await;

        let stream = provider(&server).generate_stream("draft").await.unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "ok");
        let err = items[1].as_ref().unwrap_err();
        assert_eq!(err.category, ErrorCategory::ParseError);
        assert_eq!(err.provider.as_deref(), Some("openai"));
    }

    #[tokio::test]
    async fn test_health_check_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        assert!(provider(&server).health_check().await.unwrap());
    }
}
