//! Provider Adapter Abstraction
//!
//! One uniform interface per hosted completion service. The orchestrator
//! holds an ordered list of adapters and never branches on provider names.
//!
//! ## Modules
//!
//! - `circuit_breaker`: per-provider health gate and shared registry
//! - `google`: Google Generative AI (Gemini) adapter
//! - `openai`: OpenAI Chat Completions adapter
//! - `sse`: incremental decoder for upstream `text/event-stream` bodies

mod circuit_breaker;
mod google;
mod openai;
mod sse;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitBreakerStats,
    CircuitState, HealthRegistry, SharedHealth,
};
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::{network as net_constants, provider as provider_constants};
use crate::types::{PolicyError, Result};

// =============================================================================
// Completion Types
// =============================================================================

/// A complete single-shot provider answer
#[derive(Debug, Clone, Default)]
pub struct ProviderCompletion {
    /// Generated text
    pub text: String,
    /// Prompt tokens as reported by the provider
    pub input_tokens: Option<u32>,
    /// Completion tokens as reported by the provider
    pub output_tokens: Option<u32>,
}

impl ProviderCompletion {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Upstream token-delta stream. Dropping it releases the HTTP connection.
pub type TextStream = BoxStream<'static, std::result::Result<String, LlmError>>;

/// Shared adapter type for concurrent access across requests.
pub type SharedProvider = Arc<dyn ProviderAdapter>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for one provider adapter
///
/// Note: API keys are never serialized to output and are redacted in debug
/// output. Each adapter converts the key to SecretString internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f32,
    /// Never serialized to output for security
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints and tests)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// USD per 1000 tokens, used for cost estimates
    #[serde(default)]
    pub cost_per_1k_tokens: f64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .field("cost_per_1k_tokens", &self.cost_per_1k_tokens)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: None,
            timeout_secs: net_constants::DEFAULT_TIMEOUT_SECS,
            temperature: provider_constants::DEFAULT_TEMPERATURE,
            api_key: None,
            api_base: None,
            max_tokens: provider_constants::DEFAULT_MAX_TOKENS,
            cost_per_1k_tokens: 0.0,
        }
    }
}

impl ProviderConfig {
    /// Configured key, else the named environment variable
    pub(crate) fn resolve_api_key(&self, env_var: &str, provider: &str) -> Result<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(env_var).ok().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                PolicyError::Config(format!(
                    "{} API key not found. Set {} env var or provide in config",
                    provider, env_var
                ))
            })
    }

    /// Configured base URL (validated, trailing slash trimmed), else the default
    pub(crate) fn resolve_api_base(&self, default: &str) -> Result<String> {
        match &self.api_base {
            Some(base) => {
                url::Url::parse(base)
                    .map_err(|e| PolicyError::Config(format!("Invalid api_base '{}': {}", base, e)))?;
                Ok(base.trim_end_matches('/').to_string())
            }
            None => Ok(default.to_string()),
        }
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(
                net_constants::CONNECTION_TIMEOUT_SECS,
            ))
            .build()
            .map_err(|e| PolicyError::LlmApi(format!("Failed to create HTTP client: {}", e)))
    }
}

// =============================================================================
// Provider Adapter Trait
// =============================================================================

/// Uniform adapter over a hosted completion API.
///
/// Adapters never retry and never consult the circuit breaker; every failure
/// is returned as an `LlmError` for the orchestrator to account for.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Single-shot completion
    async fn generate(&self, prompt: &str) -> std::result::Result<ProviderCompletion, LlmError>;

    /// Open a token-delta stream. Errors opening the stream and errors
    /// mid-stream are both provider failures.
    async fn generate_stream(&self, prompt: &str) -> std::result::Result<TextStream, LlmError>;

    /// Provider name used for breaker accounting and logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// USD per 1000 tokens
    fn cost_per_1k_tokens(&self) -> f64 {
        0.0
    }

    /// Check if the provider endpoint is reachable with the configured key
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared adapter from configuration
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<SharedProvider> {
    match name {
        provider_constants::GOOGLE => Ok(Arc::new(GoogleProvider::new(config.clone())?)),
        provider_constants::OPENAI => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        _ => Err(PolicyError::Config(format!(
            "Unknown provider: {}. Supported: {}, {}",
            name,
            provider_constants::GOOGLE,
            provider_constants::OPENAI
        ))),
    }
}

/// Read an error response body and classify it by status
pub(crate) async fn status_error(response: reqwest::Response, provider: &str) -> LlmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ErrorClassifier::classify_http_status(
        status.as_u16(),
        &format!("{} API error ({}): {}", provider, status, body),
        provider,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..ProviderConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_api_key_never_serialized() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..ProviderConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let err = create_provider("anthropic", &ProviderConfig::default()).err().unwrap();
        assert!(matches!(err, PolicyError::Config(_)));
    }

    #[test]
    fn test_invalid_api_base_rejected() {
        let config = ProviderConfig {
            api_key: Some("k".to_string()),
            api_base: Some("not a url".to_string()),
            ..ProviderConfig::default()
        };
        assert!(matches!(
            create_provider("openai", &config),
            Err(PolicyError::Config(_))
        ));
    }

    #[test]
    fn test_factory_builds_known_providers() {
        let config = ProviderConfig {
            api_key: Some("k".to_string()),
            api_base: Some("http://localhost:9/".to_string()),
            ..ProviderConfig::default()
        };
        let google = create_provider("google", &config).unwrap();
        assert_eq!(google.name(), "google");
        let openai = create_provider("openai", &config).unwrap();
        assert_eq!(openai.name(), "openai");
    }
}
