//! Unified Timeout Configuration
//!
//! Every upstream call is bounded: single-shot requests by `llm_request`,
//! streaming reads by `stream_idle` (the gap allowed between two upstream
//! chunks), and connection setup by `connection`.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::{TimeoutConfig, with_provider_timeout};
//!
//! let config = TimeoutConfig::default();
//! let completion = with_provider_timeout(
//!     config.llm_request,
//!     adapter.generate(&prompt),
//!     "google generate",
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::constants::{network as net_constants, stream as stream_constants};
use crate::types::{LlmError, PolicyError, Result};

/// Unified timeout configuration for all operations
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for a complete single-shot provider request (default: 60 seconds)
    pub llm_request: Duration,
    /// Maximum wait between two upstream stream chunks (default: 30 seconds)
    pub stream_idle: Duration,
    /// Timeout for network connections (default: 10 seconds)
    pub connection: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_request: Duration::from_secs(net_constants::DEFAULT_TIMEOUT_SECS),
            stream_idle: Duration::from_secs(stream_constants::IDLE_TIMEOUT_SECS),
            connection: Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn new(llm_request: Duration, stream_idle: Duration) -> Self {
        Self {
            llm_request,
            stream_idle,
            ..Self::default()
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(PolicyError::timeout(operation_name, timeout)),
    }
}

/// Execute a provider call with a timeout.
///
/// An expired deadline becomes an `LlmError` so it counts against the
/// provider's circuit breaker like any other upstream failure.
pub async fn with_provider_timeout<T, F>(
    timeout: Duration,
    future: F,
    operation_name: &str,
) -> std::result::Result<T, LlmError>
where
    F: Future<Output = std::result::Result<T, LlmError>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;

    #[test]
    fn test_timeout_config_defaults() {
        let config = TimeoutConfig::default();
        assert_eq!(config.llm_request.as_secs(), 60);
        assert_eq!(config.stream_idle.as_secs(), 30);
        assert_eq!(config.connection.as_secs(), 10);
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, PolicyError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, PolicyError>(42)
            },
            "slow operation",
        )
        .await;
        assert!(matches!(result.unwrap_err(), PolicyError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_provider_timeout_is_network_error() {
        let result = with_provider_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, LlmError>("late")
            },
            "google generate",
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Network);
        assert!(err.message.contains("google generate"));
    }
}
