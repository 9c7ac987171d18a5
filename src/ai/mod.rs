//! AI Integration Layer
//!
//! Provider adapters, health tracking, prompt construction and the
//! orchestrator that ties them together for policy generation.

pub mod cache;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod timeout;

pub use cache::{CacheConfig, CacheStats, ResponseCache, cache_key};
pub use orchestrator::{
    AttemptOutcome, ChunkStream, OrchestratorConfig, PolicyOrchestrator,
    PolicyOrchestratorBuilder, StreamSettings, estimate_usage, score_confidence,
};
pub use prompt::{PromptBuilder, continuation_prompt, policy_prompt};
pub use provider::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitBreakerStats,
    CircuitState, HealthRegistry, ProviderAdapter, ProviderConfig, SharedHealth, SharedProvider,
    create_provider,
};
pub use timeout::{TimeoutConfig, with_provider_timeout, with_timeout};
