//! Circuit Breaker Pattern for Provider Resilience
//!
//! Gates calls to a flaky upstream provider so a failing provider costs
//! nothing but a map lookup until it has had time to recover.
//!
//! ## States
//!
//! - **Closed**: Normal operation, requests flow through
//! - **Open**: Provider is failing, requests are rejected immediately
//! - **HalfOpen**: A limited number of trial requests test recovery
//!
//! ## Transitions
//!
//! ```text
//! Closed   --[failure_threshold consecutive failures]--> Open
//! Open     --[recovery_timeout elapsed, next availability check]--> HalfOpen
//! HalfOpen --[any success]--> Closed
//! HalfOpen --[any failure]--> Open (timer restarts)
//! HalfOpen --[budget spent, no outcome for recovery_timeout]--> HalfOpen (budget refilled)
//! ```
//!
//! A trial whose caller is cancelled never reports an outcome, so an
//! exhausted half-open budget is refilled after another recovery timeout.
//!
//! Breakers never fail; they only report. Callers decide whether to call.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::constants::circuit_breaker as cb_constants;
use crate::types::LlmError;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation - requests flow through
    Closed,
    /// Provider is failing - requests rejected immediately
    Open,
    /// Testing recovery - limited requests allowed
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,
    /// Duration to wait before transitioning from open to half-open
    pub recovery_timeout: Duration,
    /// Maximum trial requests allowed in half-open state
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: cb_constants::FAILURE_THRESHOLD,
            recovery_timeout: Duration::from_secs(cb_constants::RECOVERY_TIMEOUT_SECS),
            half_open_max_calls: cb_constants::HALF_OPEN_MAX_CALLS,
        }
    }
}

/// Unified internal state - all mutable state in single struct
/// to ensure atomicity of state transitions
#[derive(Debug)]
struct CircuitBreakerInner {
    state: CircuitState,
    failure_count: u32,
    half_open_calls: u32,
    opened_at: Option<Instant>,
    half_open_at: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    blocked_count: u64,
}

impl CircuitBreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            half_open_calls: 0,
            opened_at: None,
            half_open_at: None,
            last_failure_at: None,
            last_error: None,
            blocked_count: 0,
        }
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.half_open_calls = 0;
        self.opened_at = None;
        self.half_open_at = None;
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.half_open_at = None;
        self.half_open_calls = 0;
    }

    fn half_open(&mut self) {
        self.state = CircuitState::HalfOpen;
        self.half_open_at = Some(Instant::now());
        self.half_open_calls = 0;
    }
}

/// Thread-safe circuit breaker for a single provider.
///
/// All state is protected by a single RwLock so failure counts and state
/// can never disagree.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    provider_name: String,
    inner: RwLock<CircuitBreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for a provider
    pub fn new(provider_name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            provider_name: provider_name.into(),
            inner: RwLock::new(CircuitBreakerInner::new()),
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider_name: impl Into<String>) -> Self {
        Self::new(provider_name, CircuitBreakerConfig::default())
    }

    /// Current state without side effects
    pub fn state(&self) -> CircuitState {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .state
    }

    /// Check if a request may proceed.
    ///
    /// Performs the Open -> HalfOpen transition once the recovery timeout has
    /// elapsed and consumes one trial slot while half-open. A spent budget
    /// with no recorded outcome for a further recovery timeout is refilled.
    pub fn allow_request(&self) -> bool {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if inner.state == CircuitState::Open
            && inner
                .opened_at
                .is_some_and(|t| t.elapsed() >= self.config.recovery_timeout)
        {
            inner.half_open();
            tracing::info!(
                "Circuit breaker [{}]: Transitioning to HALF_OPEN (testing recovery)",
                self.provider_name
            );
        } else if inner.state == CircuitState::HalfOpen
            && inner.half_open_calls >= self.config.half_open_max_calls
            && inner
                .half_open_at
                .is_some_and(|t| t.elapsed() >= self.config.recovery_timeout)
        {
            inner.half_open();
            tracing::info!(
                "Circuit breaker [{}]: No trial outcome within {:?}, refilling trial budget",
                self.provider_name,
                self.config.recovery_timeout
            );
        }

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                inner.blocked_count += 1;
                tracing::debug!(
                    "Circuit breaker [{}]: Request blocked (circuit OPEN)",
                    self.provider_name
                );
                false
            }
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.config.half_open_max_calls {
                    inner.half_open_calls += 1;
                    tracing::debug!(
                        "Circuit breaker [{}]: Allowing trial request ({}/{})",
                        self.provider_name,
                        inner.half_open_calls,
                        self.config.half_open_max_calls
                    );
                    true
                } else {
                    inner.blocked_count += 1;
                    tracing::debug!(
                        "Circuit breaker [{}]: Half-open trial budget exhausted",
                        self.provider_name
                    );
                    false
                }
            }
        }
    }

    /// Record a successful request
    pub fn record_success(&self) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        inner.failure_count = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.close();
            tracing::info!(
                "Circuit breaker [{}]: Closed (provider recovered)",
                self.provider_name
            );
        }
    }

    /// Record a failed request
    pub fn record_failure(&self, error: &str) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        inner.last_failure_at = Some(Utc::now());
        inner.last_error = Some(error.to_string());

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = inner.failure_count.saturating_add(1);

                if inner.failure_count >= self.config.failure_threshold {
                    inner.open();
                    tracing::warn!(
                        "Circuit breaker [{}]: Opened after {} failures (recovery in {:?})",
                        self.provider_name,
                        inner.failure_count,
                        self.config.recovery_timeout
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                inner.open();
                tracing::warn!(
                    "Circuit breaker [{}]: Re-opened after failure in half-open state",
                    self.provider_name
                );
            }
            CircuitState::Open => {
                // Late failure from a call admitted before the circuit opened
            }
        }
    }

    /// Get statistics for monitoring
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        CircuitBreakerStats {
            provider_name: self.provider_name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            half_open_calls: inner.half_open_calls,
            blocked_count: inner.blocked_count,
            open_for_secs: inner.opened_at.map(|t| t.elapsed().as_secs_f64()),
            last_failure_at: inner.last_failure_at,
            last_error: inner.last_error.clone(),
        }
    }

    /// Force reset to closed state (for manual intervention)
    pub fn reset(&self) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        inner.close();
        inner.blocked_count = 0;

        tracing::info!(
            "Circuit breaker [{}]: Manually reset to CLOSED",
            self.provider_name
        );
    }
}

/// Statistics for monitoring circuit breaker state
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub provider_name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub half_open_calls: u32,
    pub blocked_count: u64,
    pub open_for_secs: Option<f64>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl CircuitBreakerStats {
    /// Format as human-readable summary
    pub fn summary(&self) -> String {
        let time_str = self
            .open_for_secs
            .map(|secs| format!(" for {:.1}s", secs))
            .unwrap_or_default();

        format!(
            "[{}] {} | failures={} trials={} blocked={}{}",
            self.provider_name,
            self.state,
            self.failure_count,
            self.half_open_calls,
            self.blocked_count,
            time_str
        )
    }
}

// =============================================================================
// Provider Health Registry
// =============================================================================

/// Shared provider health store.
///
/// All mutation goes through `record_success` / `record_failure`; the
/// in-memory implementation can be swapped for a distributed one when
/// several server instances must agree on provider health.
pub trait HealthRegistry: Send + Sync {
    /// True iff the provider is closed, or half-open with trial budget left
    fn is_model_available(&self, provider: &str) -> bool;

    fn record_success(&self, provider: &str);

    fn record_failure(&self, provider: &str, error: &LlmError);

    /// Read-only state lookup; unknown providers are closed
    fn get_state(&self, provider: &str) -> CircuitState;

    fn stats(&self) -> Vec<CircuitBreakerStats>;

    /// Manually close a provider's circuit. Returns false if unknown.
    fn reset(&self, provider: &str) -> bool;
}

pub type SharedHealth = Arc<dyn HealthRegistry>;

/// In-process registry: one breaker per provider name in a concurrent map
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<String, CircuitBreaker>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    pub fn shared(config: CircuitBreakerConfig) -> SharedHealth {
        Arc::new(Self::new(config))
    }

    fn with_breaker<R>(&self, provider: &str, f: impl FnOnce(&CircuitBreaker) -> R) -> R {
        if let Some(breaker) = self.breakers.get(provider) {
            return f(&breaker);
        }
        let breaker = self
            .breakers
            .entry(provider.to_string())
            .or_insert_with(|| CircuitBreaker::new(provider, self.config.clone()));
        f(&breaker)
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl HealthRegistry for CircuitBreakerRegistry {
    fn is_model_available(&self, provider: &str) -> bool {
        self.with_breaker(provider, |cb| cb.allow_request())
    }

    fn record_success(&self, provider: &str) {
        self.with_breaker(provider, |cb| cb.record_success());
    }

    fn record_failure(&self, provider: &str, error: &LlmError) {
        let message = error.to_string();
        self.with_breaker(provider, |cb| cb.record_failure(&message));
    }

    fn get_state(&self, provider: &str) -> CircuitState {
        self.breakers
            .get(provider)
            .map(|cb| cb.state())
            .unwrap_or(CircuitState::Closed)
    }

    fn stats(&self) -> Vec<CircuitBreakerStats> {
        let mut stats: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| entry.value().stats())
            .collect();
        stats.sort_by(|a, b| a.provider_name.cmp(&b.provider_name));
        stats
    }

    fn reset(&self, provider: &str) -> bool {
        match self.breakers.get(provider) {
            Some(cb) => {
                cb.reset();
                true
            }
            None => false,
        }
    }
}
