//! Generation Outcomes
//!
//! `GenerationResult` is the single-shot answer; `StreamChunk` is one unit of
//! a streaming answer. Both are immutable once built and serialize directly
//! to the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request::{GenerationRequest, PolicyType};

/// Token and cost estimate for one generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageEstimate {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub estimated_cost_usd: f64,
}

impl UsageEstimate {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Outcome of one generation attempt.
///
/// A failed result always carries both `error_message` and a non-empty
/// `fallback_content`; build it through [`GenerationResult::all_failed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    pub policy_id: String,
    pub framework_id: String,
    pub policy_type: PolicyType,
    /// AI-generated policy text (present on success)
    #[serde(default)]
    pub content: Option<String>,
    pub confidence_score: f32,
    #[serde(default)]
    pub provider_used: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Static template text (present when every provider failed)
    #[serde(default)]
    pub fallback_content: Option<String>,
    pub generation_time_ms: u64,
    #[serde(default)]
    pub usage: UsageEstimate,
    #[serde(default)]
    pub was_cached: bool,
    pub generated_at: DateTime<Utc>,
}

impl GenerationResult {
    /// Successful provider generation
    pub fn generated(
        request: &GenerationRequest,
        content: String,
        provider: &str,
        model: &str,
        confidence_score: f32,
        usage: UsageEstimate,
        generation_time_ms: u64,
    ) -> Self {
        Self {
            success: true,
            policy_id: uuid::Uuid::new_v4().to_string(),
            framework_id: request.framework_id.clone(),
            policy_type: request.policy_type,
            content: Some(content),
            confidence_score: confidence_score.clamp(0.0, 1.0),
            provider_used: Some(provider.to_string()),
            model: Some(model.to_string()),
            error_message: None,
            fallback_content: None,
            generation_time_ms,
            usage,
            was_cached: false,
            generated_at: Utc::now(),
        }
    }

    /// Terminal result when no provider produced content
    pub fn all_failed(
        request: &GenerationRequest,
        fallback_content: String,
        error_message: String,
        generation_time_ms: u64,
    ) -> Self {
        Self {
            success: false,
            policy_id: uuid::Uuid::new_v4().to_string(),
            framework_id: request.framework_id.clone(),
            policy_type: request.policy_type,
            content: None,
            confidence_score: 0.0,
            provider_used: None,
            model: None,
            error_message: Some(error_message),
            fallback_content: Some(fallback_content),
            generation_time_ms,
            usage: UsageEstimate::default(),
            was_cached: false,
            generated_at: Utc::now(),
        }
    }

    /// Copy served from the response cache
    pub fn as_cached(&self) -> Self {
        Self {
            was_cached: true,
            ..self.clone()
        }
    }

    /// The text a consumer should display: generated content, else fallback
    pub fn text(&self) -> &str {
        self.content
            .as_deref()
            .or(self.fallback_content.as_deref())
            .unwrap_or_default()
    }
}

// =============================================================================
// Streaming
// =============================================================================

/// Kind of a streaming chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Metadata,
    Content,
    Complete,
    Error,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Content => "content",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// `complete` and `error` end a stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// One unit of a streaming response, consumed once by the SSE encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    pub stream_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl StreamChunk {
    pub fn metadata(stream_id: &str, metadata: Value) -> Self {
        Self {
            kind: ChunkKind::Metadata,
            content: String::new(),
            progress: Some(0.0),
            stream_id: stream_id.to_string(),
            metadata: Some(metadata),
        }
    }

    pub fn content(stream_id: &str, content: impl Into<String>, progress: f32) -> Self {
        Self {
            kind: ChunkKind::Content,
            content: content.into(),
            progress: Some(progress),
            stream_id: stream_id.to_string(),
            metadata: None,
        }
    }

    pub fn complete(stream_id: &str, metadata: Value) -> Self {
        Self {
            kind: ChunkKind::Complete,
            content: String::new(),
            progress: Some(1.0),
            stream_id: stream_id.to_string(),
            metadata: Some(metadata),
        }
    }

    pub fn error(stream_id: &str, message: impl Into<String>, metadata: Option<Value>) -> Self {
        Self {
            kind: ChunkKind::Error,
            content: message.into(),
            progress: None,
            stream_id: stream_id.to_string(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::request::sample_request;

    #[test]
    fn test_failed_result_carries_fallback_and_error() {
        let result = GenerationResult::all_failed(
            &sample_request(),
            "static text".to_string(),
            "all providers failed".to_string(),
            12,
        );
        assert!(!result.success);
        assert_eq!(result.fallback_content.as_deref(), Some("static text"));
        assert!(result.error_message.is_some());
        assert_eq!(result.text(), "static text");
        assert_eq!(result.confidence_score, 0.0);
    }

    #[test]
    fn test_cached_copy() {
        let result = GenerationResult::generated(
            &sample_request(),
            "policy".to_string(),
            "google",
            "gemini",
            1.4,
            UsageEstimate::default(),
            5,
        );
        assert_eq!(result.confidence_score, 1.0);
        let cached = result.as_cached();
        assert!(cached.was_cached);
        assert!(!result.was_cached);
        assert_eq!(cached.policy_id, result.policy_id);
    }

    #[test]
    fn test_chunk_json_shape() {
        let chunk = StreamChunk::content("s-1", "Hello", 0.05);
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["type"], "content");
        assert_eq!(json["content"], "Hello");
        assert_eq!(json["stream_id"], "s-1");
        assert!(json.get("metadata").is_none());

        let error = StreamChunk::error("s-1", "boom", None);
        assert!(error.kind.is_terminal());
        assert!(serde_json::to_value(&error).unwrap().get("progress").is_none());
    }
}
