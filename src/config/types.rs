//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Every section is `#[serde(default)]`, so a config file only needs the
//! keys it overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ai::cache::CacheConfig;
use crate::ai::orchestrator::StreamSettings;
use crate::ai::provider::{CircuitBreakerConfig, ProviderConfig};
use crate::constants::{
    circuit_breaker as cb_constants, network as net_constants, provider as provider_constants,
    server as server_constants, stream as stream_constants,
};
use crate::types::{PolicyError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider settings
    pub llm: LlmConfig,

    /// Per-provider health gating
    pub circuit_breaker: CircuitBreakerSettings,

    /// Response cache
    pub cache: CacheSettings,

    /// Streaming behaviour
    pub stream: StreamConfig,

    /// HTTP server
    pub server: ServerConfig,

    /// Compliance framework catalog
    pub frameworks: FrameworksConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `PolicyError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(PolicyError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(PolicyError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.stream.idle_timeout_secs == 0 {
            return Err(PolicyError::Config(
                "Stream idle_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.circuit_breaker.failure_threshold == 0 {
            return Err(PolicyError::Config(
                "Circuit breaker failure_threshold must be greater than 0".to_string(),
            ));
        }

        if self.circuit_breaker.half_open_max_calls == 0 {
            return Err(PolicyError::Config(
                "Circuit breaker half_open_max_calls must be greater than 0".to_string(),
            ));
        }

        self.llm.settings(&self.llm.primary)?;
        if let Some(fallback) = self.llm.fallback_provider() {
            self.llm.settings(fallback)?;
            if fallback == self.llm.primary {
                return Err(PolicyError::Config(format!(
                    "Fallback provider must differ from primary ({})",
                    fallback
                )));
            }
        }

        if !(self.stream.progress_step.is_finite() && self.stream.progress_step > 0.0) {
            return Err(PolicyError::Config(format!(
                "Stream progress_step must be a positive number, got {}",
                self.stream.progress_step
            )));
        }

        if !(self.stream.progress_cap > 0.0 && self.stream.progress_cap < 1.0) {
            return Err(PolicyError::Config(format!(
                "Stream progress_cap must be between 0.0 and 1.0 (exclusive), got {}",
                self.stream.progress_cap
            )));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider tried first
    pub primary: String,

    /// Provider tried when the primary fails (unset or "" disables fallback)
    pub fallback: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature shared by all providers
    pub temperature: f32,

    /// Completion budget shared by all providers
    pub max_tokens: usize,

    pub google: ProviderSettings,

    pub openai: ProviderSettings,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: provider_constants::GOOGLE.to_string(),
            fallback: Some(provider_constants::OPENAI.to_string()),
            timeout_secs: net_constants::DEFAULT_TIMEOUT_SECS,
            temperature: provider_constants::DEFAULT_TEMPERATURE,
            max_tokens: provider_constants::DEFAULT_MAX_TOKENS,
            google: ProviderSettings {
                model: "gemini-1.5-pro".to_string(),
                cost_per_1k_tokens: 0.0035,
                ..ProviderSettings::default()
            },
            openai: ProviderSettings {
                model: "gpt-4o".to_string(),
                cost_per_1k_tokens: 0.005,
                ..ProviderSettings::default()
            },
        }
    }
}

impl LlmConfig {
    /// Configured fallback; TOML has no null, so an empty name disables it
    pub fn fallback_provider(&self) -> Option<&str> {
        self.fallback.as_deref().filter(|name| !name.trim().is_empty())
    }

    fn settings(&self, name: &str) -> Result<&ProviderSettings> {
        match name {
            provider_constants::GOOGLE => Ok(&self.google),
            provider_constants::OPENAI => Ok(&self.openai),
            _ => Err(PolicyError::Config(format!(
                "Unknown provider: {}. Supported: {}, {}",
                name,
                provider_constants::GOOGLE,
                provider_constants::OPENAI
            ))),
        }
    }

    /// Adapter configuration for a named provider
    pub fn provider_config(&self, name: &str) -> Result<ProviderConfig> {
        let settings = self.settings(name)?;
        Ok(ProviderConfig {
            model: Some(settings.model.clone()).filter(|m| !m.trim().is_empty()),
            timeout_secs: self.timeout_secs,
            temperature: self.temperature,
            api_key: settings.api_key.clone(),
            api_base: settings.api_base.clone(),
            max_tokens: self.max_tokens,
            cost_per_1k_tokens: settings.cost_per_1k_tokens,
        })
    }
}

/// Settings for one hosted provider
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub model: String,

    /// Falls back to the provider's API key environment variable.
    /// Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub api_base: Option<String>,

    /// USD per 1000 tokens, for cost estimates
    pub cost_per_1k_tokens: f64,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("cost_per_1k_tokens", &self.cost_per_1k_tokens)
            .finish()
    }
}

// =============================================================================
// Circuit Breaker Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before a trial request
    pub recovery_timeout_secs: u64,

    /// Trial requests admitted while half-open
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: cb_constants::FAILURE_THRESHOLD,
            recovery_timeout_secs: cb_constants::RECOVERY_TIMEOUT_SECS,
            half_open_max_calls: cb_constants::HALF_OPEN_MAX_CALLS,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
            half_open_max_calls: self.half_open_max_calls,
        }
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,

    /// Maximum entries (unset = unbounded)
    pub max_entries: Option<usize>,

    /// Entry lifetime in seconds (unset = process lifetime)
    pub ttl_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: None,
            ttl_secs: None,
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.enabled,
            max_entries: self.max_entries,
            ttl: self.ttl_secs.map(Duration::from_secs),
        }
    }
}

// =============================================================================
// Stream Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum wait for the next upstream delta
    pub idle_timeout_secs: u64,

    pub progress_step: f32,

    pub progress_cap: f32,

    /// Maximum content chunks when replaying a single-shot result
    pub replay_max_chunks: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: stream_constants::IDLE_TIMEOUT_SECS,
            progress_step: stream_constants::PROGRESS_STEP,
            progress_cap: stream_constants::PROGRESS_CAP,
            replay_max_chunks: stream_constants::REPLAY_MAX_CHUNKS,
        }
    }
}

impl StreamConfig {
    pub fn to_settings(&self) -> StreamSettings {
        StreamSettings {
            progress_step: self.progress_step,
            progress_cap: self.progress_cap,
            replay_max_chunks: self.replay_max_chunks,
        }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server_constants::DEFAULT_HOST.to_string(),
            port: server_constants::DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Framework Catalog Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworksConfig {
    /// YAML file merged over the built-in catalog
    pub catalog_path: Option<PathBuf>,
}

// =============================================================================
// Tests
// =============================================================================
