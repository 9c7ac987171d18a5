//! Policy Generation Orchestrator
//!
//! Sequences every generation through the same path:
//!
//! 1. Validate the request and resolve its framework
//! 2. Response cache lookup
//! 3. Providers in configured order (primary, then fallback), each gated by
//!    its circuit breaker and bounded by a timeout
//! 4. Static framework template when no provider produced content
//!
//! Provider failures never escape as errors: they are recorded against the
//! breaker and answered with the next option. Only malformed requests
//! (validation failure, unknown framework) are returned as `Err`.
//!
//! ## Modules
//!
//! - `fallback`: static template rendering and paragraph replay
//! - `stream`: streaming state machine over the same path

mod fallback;
mod stream;
#[cfg(test)]
pub(crate) mod testing;

pub use fallback::{render_fallback, split_for_replay};
pub use stream::{ChunkStream, StreamSettings};

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::ai::cache::{ResponseCache, cache_key};
use crate::ai::prompt::policy_prompt;
use crate::ai::provider::{
    CircuitBreaker, CircuitBreakerRegistry, CircuitBreakerStats, LlmError, ProviderCompletion,
    SharedHealth, SharedProvider, create_provider,
};
use crate::ai::timeout::{TimeoutConfig, with_provider_timeout};
use crate::config::Config;
use crate::constants::scoring;
use crate::frameworks::{FrameworkCatalog, SharedFrameworks};
use crate::types::{
    ComplianceFramework, CustomizationLevel, GenerationRequest, GenerationResult, PolicyError,
    Result, UsageEstimate, estimate_tokens,
};

/// Outcome of one gated provider attempt
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    /// Provider answered
    Completed(T),
    /// Circuit breaker refused the call; nothing was sent
    Skipped,
    /// Call failed and was recorded against the breaker
    Failed(LlmError),
}

/// Orchestrator tuning
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub timeouts: TimeoutConfig,
    pub stream: StreamSettings,
}

/// AI policy generation with breaker-gated provider fallback.
///
/// Cheap to clone: all shared state sits behind `Arc`s, so clones observe
/// the same breakers and cache.
#[derive(Clone)]
pub struct PolicyOrchestrator {
    adapters: Vec<SharedProvider>,
    health: SharedHealth,
    cache: Arc<ResponseCache>,
    frameworks: SharedFrameworks,
    config: OrchestratorConfig,
}

impl PolicyOrchestrator {
    pub fn builder(frameworks: SharedFrameworks) -> PolicyOrchestratorBuilder {
        PolicyOrchestratorBuilder::new(frameworks)
    }

    /// Wire providers, breakers, cache and framework catalog from configuration.
    ///
    /// The primary provider must be constructible; a fallback that cannot be
    /// built (e.g. missing API key) is logged and left out.
    pub fn from_config(config: &Config) -> Result<Self> {
        let frameworks = FrameworkCatalog::load(config.frameworks.catalog_path.as_deref())?;

        let primary = create_provider(
            &config.llm.primary,
            &config.llm.provider_config(&config.llm.primary)?,
        )?;
        let mut builder = Self::builder(Arc::new(frameworks))
            .provider(primary)
            .health(CircuitBreakerRegistry::shared(
                config.circuit_breaker.to_breaker_config(),
            ))
            .cache(Arc::new(ResponseCache::new(config.cache.to_cache_config())))
            .config(OrchestratorConfig {
                timeouts: TimeoutConfig::new(
                    std::time::Duration::from_secs(config.llm.timeout_secs),
                    std::time::Duration::from_secs(config.stream.idle_timeout_secs),
                ),
                stream: config.stream.to_settings(),
            });

        if let Some(name) = config.llm.fallback_provider() {
            match config
                .llm
                .provider_config(name)
                .and_then(|pc| create_provider(name, &pc))
            {
                Ok(fallback) => builder = builder.provider(fallback),
                Err(e) => warn!(provider = %name, error = %e, "Fallback provider disabled"),
            }
        }

        builder.build()
    }

    /// Single-shot generation.
    ///
    /// Returns `Err` only for malformed requests; every provider-side failure
    /// ends in `Ok(result)` with `success == false` and fallback content.
    #[instrument(skip(self, request), fields(framework = %request.framework_id, policy_type = %request.policy_type))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let (request, framework) = self.resolve(request)?;
        Ok(self.generate_resolved(&request, &framework).await)
    }

    /// Validate and normalize a request, then look up its framework.
    ///
    /// The returned request carries the catalog's framework id and feeds the
    /// cache key, the prompt and the result alike.
    pub(crate) fn resolve(
        &self,
        request: &GenerationRequest,
    ) -> Result<(GenerationRequest, ComplianceFramework)> {
        request.validate()?;
        let mut request = request.normalized();
        let framework = self
            .frameworks
            .get(&request.framework_id)
            .ok_or_else(|| PolicyError::FrameworkNotFound(request.framework_id.clone()))?;
        request.framework_id = framework.id.clone();
        Ok((request, framework))
    }

    pub(crate) async fn generate_resolved(
        &self,
        request: &GenerationRequest,
        framework: &ComplianceFramework,
    ) -> GenerationResult {
        let start = Instant::now();
        let key = cache_key(request);

        if let Some(hit) = self.cache.get(&key) {
            info!(key = %key, "Serving cached policy");
            return hit;
        }

        let prompt = policy_prompt(request, framework);
        let mut failures = Vec::new();

        for adapter in &self.adapters {
            match self.attempt(adapter, &prompt).await {
                AttemptOutcome::Completed(completion) => {
                    let result =
                        self.build_result(request, framework, adapter, &prompt, completion, start);
                    info!(
                        provider = %adapter.name(),
                        confidence = result.confidence_score,
                        ms = result.generation_time_ms,
                        "Policy generated"
                    );
                    self.cache.put(key, result.clone());
                    return result;
                }
                AttemptOutcome::Skipped => {
                    failures.push(format!("{}: circuit open", adapter.name()));
                }
                AttemptOutcome::Failed(err) => failures.push(err.to_string()),
            }
        }

        let message = if failures.is_empty() {
            "No AI providers configured".to_string()
        } else {
            format!("All AI providers failed: {}", failures.join("; "))
        };
        warn!(error = %message, "Falling back to static template");

        GenerationResult::all_failed(
            request,
            render_fallback(framework, request),
            message,
            start.elapsed().as_millis() as u64,
        )
    }

    async fn attempt(
        &self,
        adapter: &SharedProvider,
        prompt: &str,
    ) -> AttemptOutcome<ProviderCompletion> {
        let name = adapter.name();
        if !self.health.is_model_available(name) {
            debug!(provider = %name, "Skipping provider (circuit open)");
            return AttemptOutcome::Skipped;
        }

        let operation = format!("{} generate", name);
        let outcome = with_provider_timeout(
            self.config.timeouts.llm_request,
            adapter.generate(prompt),
            &operation,
        )
        .await
        .and_then(|completion| {
            if completion.text.trim().is_empty() {
                Err(LlmError::malformed("Provider returned empty content"))
            } else {
                Ok(completion)
            }
        });

        match outcome {
            Ok(completion) => {
                self.health.record_success(name);
                AttemptOutcome::Completed(completion)
            }
            Err(err) => {
                let err = self.record_failure(name, err);
                AttemptOutcome::Failed(err)
            }
        }
    }

    /// Attach provider context and account a failure against the breaker
    pub(crate) fn record_failure(&self, provider: &str, err: LlmError) -> LlmError {
        let err = if err.provider.is_none() {
            err.provider(provider)
        } else {
            err
        };
        self.health.record_failure(provider, &err);
        warn!(
            provider = %provider,
            category = %err.category,
            state = %self.health.get_state(provider),
            error = %err.message,
            "Provider failed"
        );
        err
    }

    fn build_result(
        &self,
        request: &GenerationRequest,
        framework: &ComplianceFramework,
        adapter: &SharedProvider,
        prompt: &str,
        completion: ProviderCompletion,
        start: Instant,
    ) -> GenerationResult {
        let confidence =
            score_confidence(&completion.text, framework, request.customization_level);
        let usage = estimate_usage(prompt, &completion, adapter.cost_per_1k_tokens());

        GenerationResult::generated(
            request,
            completion.text,
            adapter.name(),
            adapter.model(),
            confidence,
            usage,
            start.elapsed().as_millis() as u64,
        )
    }

    /// Shared breaker registry
    pub fn health(&self) -> &SharedHealth {
        &self.health
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn frameworks(&self) -> &SharedFrameworks {
        &self.frameworks
    }

    /// Adapters in attempt order
    pub fn providers(&self) -> &[SharedProvider] {
        &self.adapters
    }

    /// Breaker stats for every configured provider, in attempt order.
    /// Providers never called yet report a fresh closed circuit.
    pub fn provider_health(&self) -> Vec<CircuitBreakerStats> {
        let stats = self.health.stats();
        self.adapters
            .iter()
            .map(|adapter| {
                stats
                    .iter()
                    .find(|s| s.provider_name == adapter.name())
                    .cloned()
                    .unwrap_or_else(|| CircuitBreaker::with_defaults(adapter.name()).stats())
            })
            .collect()
    }
}

/// Builder for [`PolicyOrchestrator`]
pub struct PolicyOrchestratorBuilder {
    adapters: Vec<SharedProvider>,
    health: Option<SharedHealth>,
    cache: Option<Arc<ResponseCache>>,
    frameworks: SharedFrameworks,
    config: OrchestratorConfig,
}

impl PolicyOrchestratorBuilder {
    pub fn new(frameworks: SharedFrameworks) -> Self {
        Self {
            adapters: Vec::new(),
            health: None,
            cache: None,
            frameworks,
            config: OrchestratorConfig::default(),
        }
    }

    /// Append a provider; providers are attempted in insertion order
    pub fn provider(mut self, adapter: SharedProvider) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn health(mut self, health: SharedHealth) -> Self {
        self.health = Some(health);
        self
    }

    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<PolicyOrchestrator> {
        if self.adapters.is_empty() {
            return Err(PolicyError::Config(
                "At least one AI provider must be configured".to_string(),
            ));
        }
        if let Some(dup) = self
            .adapters
            .iter()
            .enumerate()
            .find(|(i, a)| self.adapters[..*i].iter().any(|b| b.name() == a.name()))
            .map(|(_, a)| a.name().to_string())
        {
            return Err(PolicyError::Config(format!(
                "Provider '{}' configured more than once",
                dup
            )));
        }

        Ok(PolicyOrchestrator {
            adapters: self.adapters,
            health: self
                .health
                .unwrap_or_else(|| Arc::new(CircuitBreakerRegistry::default())),
            cache: self.cache.unwrap_or_default(),
            frameworks: self.frameworks,
            config: self.config,
        })
    }
}

/// Heuristic quality score for AI-generated text in [0, 1].
///
/// Base confidence, plus requirement coverage, plus a bonus when the text
/// reaches the length expected for the customization level.
pub fn score_confidence(
    content: &str,
    framework: &ComplianceFramework,
    level: CustomizationLevel,
) -> f32 {
    let lower = content.to_lowercase();

    let coverage = if framework.key_requirements.is_empty() {
        1.0
    } else {
        let covered = framework
            .key_requirements
            .iter()
            .filter(|r| requirement_mentioned(&lower, r))
            .count();
        covered as f32 / framework.key_requirements.len() as f32
    };

    let length_bonus = if content.chars().count() >= level.min_content_chars() {
        scoring::LENGTH_BONUS
    } else {
        0.0
    };

    (scoring::BASE_CONFIDENCE + scoring::COVERAGE_WEIGHT * coverage + length_bonus).clamp(0.0, 1.0)
}

/// A requirement counts as mentioned when at least half of its significant
/// words appear in the text
fn requirement_mentioned(lower_content: &str, requirement: &str) -> bool {
    let words: Vec<String> = requirement
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(str::to_lowercase)
        .collect();

    if words.is_empty() {
        return lower_content.contains(&requirement.to_lowercase());
    }

    let found = words.iter().filter(|w| lower_content.contains(w.as_str())).count();
    found * 2 >= words.len()
}

/// Provider-reported usage where available, otherwise estimated from text
pub fn estimate_usage(
    prompt: &str,
    completion: &ProviderCompletion,
    cost_per_1k_tokens: f64,
) -> UsageEstimate {
    let input_tokens = completion
        .input_tokens
        .unwrap_or_else(|| estimate_tokens(prompt) as u32);
    let output_tokens = completion
        .output_tokens
        .unwrap_or_else(|| estimate_tokens(&completion.text) as u32);

    UsageEstimate {
        input_tokens,
        output_tokens,
        estimated_cost_usd: f64::from(input_tokens + output_tokens) / 1000.0 * cost_per_1k_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{MockProvider, orchestrator_with};
    use super::*;
    use crate::ai::provider::CircuitState;
    use crate::frameworks::{FrameworkCatalog, FrameworkSource};
    use crate::types::request::sample_request;

    fn gdpr() -> ComplianceFramework {
        FrameworkCatalog::builtin().get("GDPR").unwrap()
    }

    #[tokio::test]
    async fn test_primary_success_is_cached() {
        let primary = MockProvider::new("google").completes("# Privacy Policy\n\nLawful basis.");
        let fallback = MockProvider::new("openai").completes("fallback text");
        let (orch, primary, fallback) = orchestrator_with(primary, fallback);

        let first = orch.generate(&sample_request()).await.unwrap();
        assert!(first.success);
        assert_eq!(first.provider_used.as_deref(), Some("google"));
        assert!(!first.was_cached);
        assert!(first.confidence_score >= 0.6);

        let second = orch.generate(&sample_request()).await.unwrap();
        assert!(second.was_cached);
        assert_eq!(second.content, first.content);

        assert_eq!(primary.generate_calls(), 1);
        assert_eq!(fallback.generate_calls(), 0);
    }

    #[tokio::test]
    async fn test_equivalent_requests_share_normalized_result() {
        let (orch, primary, _) = orchestrator_with(
            MockProvider::new("google").completes("# Privacy Policy"),
            MockProvider::new("openai"),
        );

        let mut padded = sample_request();
        padded.framework_id = " gdpr ".to_string();
        padded.business_context.organization_name = " Acme Ltd  ".to_string();
        padded.business_context.industry = "Retail ".to_string();

        let first = orch.generate(&padded).await.unwrap();
        assert_eq!(first.framework_id, "GDPR");
        assert!(!first.was_cached);

        let second = orch.generate(&sample_request()).await.unwrap();
        assert!(second.was_cached);
        assert_eq!(second.framework_id, "GDPR");
        assert_eq!(primary.generate_calls(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_when_primary_fails() {
        let (orch, primary, fallback) = orchestrator_with(
            MockProvider::new("google"),
            MockProvider::new("openai").completes("# Policy from fallback"),
        );

        let result = orch.generate(&sample_request()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.provider_used.as_deref(), Some("openai"));
        assert_eq!(primary.generate_calls(), 1);
        assert_eq!(fallback.generate_calls(), 1);
        assert_eq!(orch.health().stats()[0].failure_count, 1);
    }

    #[tokio::test]
    async fn test_both_fail_returns_static_fallback() {
        let (orch, _, _) =
            orchestrator_with(MockProvider::new("google"), MockProvider::new("openai"));

        let result = orch.generate(&sample_request()).await.unwrap();
        assert!(!result.success);
        assert!(result.content.is_none());
        let fallback = result.fallback_content.as_deref().unwrap();
        assert!(!fallback.trim().is_empty());
        assert!(fallback.contains("Acme Ltd"));
        let error = result.error_message.unwrap();
        assert!(error.contains("google"));
        assert!(error.contains("openai"));

        // failures are not cached
        assert_eq!(orch.cache().stats().entries, 0);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_provider() {
        let (orch, primary, fallback) = orchestrator_with(
            MockProvider::new("google"),
            MockProvider::new("openai").completes("# Policy"),
        );

        for _ in 0..3 {
            orch.cache().clear();
            orch.generate(&sample_request()).await.unwrap();
        }
        assert_eq!(orch.health().get_state("google"), CircuitState::Open);
        assert_eq!(primary.generate_calls(), 3);

        orch.cache().clear();
        let result = orch.generate(&sample_request()).await.unwrap();
        assert_eq!(result.provider_used.as_deref(), Some("openai"));
        assert_eq!(primary.generate_calls(), 3);
        assert_eq!(fallback.generate_calls(), 4);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let (orch, _, _) = orchestrator_with(
            MockProvider::new("google").completes("late").with_delay(std::time::Duration::from_secs(5)),
            MockProvider::new("openai").completes("# Policy"),
        );
        let orch = PolicyOrchestrator {
            config: OrchestratorConfig {
                timeouts: TimeoutConfig::new(
                    std::time::Duration::from_millis(20),
                    std::time::Duration::from_secs(1),
                ),
                ..OrchestratorConfig::default()
            },
            ..orch
        };

        let result = orch.generate(&sample_request()).await.unwrap();
        assert_eq!(result.provider_used.as_deref(), Some("openai"));
        let stats = orch.health().stats();
        let google = stats.iter().find(|s| s.provider_name == "google").unwrap();
        assert!(google.last_error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_malformed_requests_are_errors() {
        let (orch, primary, _) =
            orchestrator_with(MockProvider::new("google"), MockProvider::new("openai"));

        let mut request = sample_request();
        request.business_context.organization_name = String::new();
        assert!(matches!(
            orch.generate(&request).await,
            Err(PolicyError::Validation(_))
        ));

        let mut request = sample_request();
        request.framework_id = "SOX".to_string();
        assert!(matches!(
            orch.generate(&request).await,
            Err(PolicyError::FrameworkNotFound(_))
        ));
        assert_eq!(primary.generate_calls(), 0);
    }

    #[test]
    fn test_builder_rejects_empty_and_duplicate_providers() {
        let frameworks: SharedFrameworks = Arc::new(FrameworkCatalog::builtin());
        assert!(PolicyOrchestrator::builder(frameworks.clone()).build().is_err());

        let dup = PolicyOrchestrator::builder(frameworks)
            .provider(Arc::new(MockProvider::new("google")))
            .provider(Arc::new(MockProvider::new("google")))
            .build();
        assert!(matches!(dup, Err(PolicyError::Config(_))));
    }

    #[tokio::test]
    async fn test_provider_health_lists_all_providers() {
        let (orch, _, _) = orchestrator_with(
            MockProvider::new("openai"),
            MockProvider::new("google").completes("# Policy"),
        );
        let before = orch.provider_health();
        assert_eq!(before.len(), 2);
        assert_eq!(before[0].provider_name, "openai");
        assert!(before.iter().all(|s| s.state == CircuitState::Closed));

        orch.generate(&sample_request()).await.unwrap();
        let after = orch.provider_health();
        assert_eq!(after[0].failure_count, 1);
        assert_eq!(after[1].failure_count, 0);
    }

    #[test]
    fn test_confidence_scoring() {
        let framework = gdpr();
        let level = CustomizationLevel::Basic;

        let bare = score_confidence("Nothing relevant here.", &framework, level);
        assert!((bare - 0.6).abs() < 1e-6);

        let thorough = framework.key_requirements.join("\n").repeat(20);
        let full = score_confidence(&thorough, &framework, level);
        assert!((full - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_usage_prefers_reported_tokens() {
        let completion = ProviderCompletion {
            text: "abcd".repeat(100),
            input_tokens: Some(1_000),
            output_tokens: None,
        };
        let usage = estimate_usage("prompt", &completion, 2.0);
        assert_eq!(usage.input_tokens, 1_000);
        assert_eq!(usage.output_tokens, 100);
        assert!((usage.estimated_cost_usd - 2.2).abs() < 1e-9);
    }
}
