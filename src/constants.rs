//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Circuit breaker constants
pub mod circuit_breaker {
    /// Number of consecutive failures before opening circuit
    pub const FAILURE_THRESHOLD: u32 = 3;

    /// Duration to wait before attempting recovery (seconds)
    pub const RECOVERY_TIMEOUT_SECS: u64 = 60;

    /// Maximum trial calls allowed in half-open state
    pub const HALF_OPEN_MAX_CALLS: u32 = 5;
}

/// Provider identifiers and defaults
pub mod provider {
    pub const GOOGLE: &str = "google";
    pub const OPENAI: &str = "openai";

    /// Default sampling temperature for policy drafting
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;

    /// Default completion budget
    pub const DEFAULT_MAX_TOKENS: usize = 4096;
}

/// Response cache constants
pub mod cache {
    /// Hex characters kept from the SHA-256 digest for cache keys
    pub const KEY_HEX_LEN: usize = 32;
}

/// Streaming constants
pub mod stream {
    /// Progress added per content chunk (approximate, cosmetic signal)
    pub const PROGRESS_STEP: f32 = 0.05;

    /// Progress never reaches 1.0 before the `complete` chunk
    pub const PROGRESS_CAP: f32 = 0.95;

    /// Maximum wait for the next upstream delta (seconds)
    pub const IDLE_TIMEOUT_SECS: u64 = 30;

    /// Maximum content chunks emitted when replaying a single-shot result
    pub const REPLAY_MAX_CHUNKS: usize = 6;
}

/// Generated content scoring constants
pub mod scoring {
    /// Base confidence for any successful AI generation
    pub const BASE_CONFIDENCE: f32 = 0.6;

    /// Weight of framework requirement coverage
    pub const COVERAGE_WEIGHT: f32 = 0.3;

    /// Bonus when content meets the minimum length for its customization level
    pub const LENGTH_BONUS: f32 = 0.1;
}

/// HTTP/Network constants
pub mod network {
    /// Default provider request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
}

/// HTTP server constants
pub mod server {
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 8080;
}
