pub mod error;
pub mod framework;
pub mod request;
pub mod result;
pub mod utils;

pub use error::{
    ErrorCategory, ErrorClassifier, LlmError, PolicyError, Result, ValidationError,
    ValidationErrorKind,
};
pub use framework::ComplianceFramework;
pub use request::{
    BusinessContext, CustomizationLevel, GenerationRequest, PolicyType, TargetAudience,
};
pub use result::{ChunkKind, GenerationResult, StreamChunk, UsageEstimate};
pub use utils::{TokenEstimator, estimate_tokens, tail_to_token_limit};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

/// Type-safe wrapper for streaming session IDs
///
/// Prevents accidental mixing of stream IDs with other string types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId(String);

impl StreamId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(format!("stream_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_ids_are_unique() {
        let a = StreamId::generate();
        let b = StreamId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("stream_"));
    }
}
