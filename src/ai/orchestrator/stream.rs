//! Streaming Generation
//!
//! An explicit state machine over the single-shot path:
//!
//! ```text
//! StreamingPrimary --ok--> Done
//!        |fail, partial content        |fail, no content
//!        v                             v
//! StreamingFallback --fail--> ReplayingStatic --success--> Done
//!        |ok                           |all failed
//!        v                             v
//!      Done                      error chunk (end)
//! ```
//!
//! Every stream starts with exactly one `metadata` chunk and ends with
//! exactly one `complete` or `error` chunk. Content already sent is never
//! retracted: a fallback continues from it rather than starting over.
//!
//! Dropping the returned stream drops the active upstream stream with it,
//! closing the provider connection.

use std::time::Instant;

use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::fallback::split_for_replay;
use super::{AttemptOutcome, PolicyOrchestrator};
use crate::ai::prompt::{continuation_prompt, policy_prompt};
use crate::ai::provider::{LlmError, SharedProvider, TextStream};
use crate::ai::timeout::with_provider_timeout;
use crate::constants::stream as stream_constants;
use crate::types::{GenerationRequest, Result, StreamChunk, StreamId};

/// Stream of chunks handed to the transport layer
pub type ChunkStream = BoxStream<'static, StreamChunk>;

/// Streaming tuning
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Progress added per content chunk
    pub progress_step: f32,
    /// Progress ceiling before completion
    pub progress_cap: f32,
    /// Maximum content chunks when replaying a single-shot result
    pub replay_max_chunks: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            progress_step: stream_constants::PROGRESS_STEP,
            progress_cap: stream_constants::PROGRESS_CAP,
            replay_max_chunks: stream_constants::REPLAY_MAX_CHUNKS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamPhase {
    StreamingPrimary,
    StreamingFallback,
    ReplayingStatic,
    Done,
}

impl StreamPhase {
    /// Next phase after the current provider failed
    fn after_failure(self, has_content: bool) -> Self {
        match self {
            Self::StreamingPrimary if has_content => Self::StreamingFallback,
            _ => Self::ReplayingStatic,
        }
    }
}

/// Approximate progress: grows by a fixed step per chunk, capped below 1.0
#[derive(Debug)]
struct Progress {
    chunks: usize,
    step: f32,
    cap: f32,
}

impl Progress {
    fn new(settings: &StreamSettings) -> Self {
        Self {
            chunks: 0,
            step: settings.progress_step,
            cap: settings.progress_cap,
        }
    }

    fn advance(&mut self) -> f32 {
        self.chunks += 1;
        (self.chunks as f32 * self.step).min(self.cap)
    }
}

impl PolicyOrchestrator {
    /// Streaming generation.
    ///
    /// Malformed requests are rejected before any chunk is produced; after
    /// that, every failure is reported inside the stream.
    #[instrument(skip(self, request), fields(framework = %request.framework_id, policy_type = %request.policy_type))]
    pub fn generate_stream(&self, request: GenerationRequest) -> Result<ChunkStream> {
        let (request, framework) = self.resolve(&request)?;
        let this = self.clone();

        let stream = async_stream::stream! {
            let stream_id = StreamId::generate();
            let id = stream_id.as_str();
            let start = Instant::now();
            let prompt = policy_prompt(&request, &framework);

            yield StreamChunk::metadata(id, json!({
                "organization_name": request.business_context.organization_name,
                "policy_type": request.policy_type,
                "framework_id": framework.id,
                "framework_name": framework.display_name,
                "customization_level": request.customization_level,
            }));

            let mut progress = Progress::new(&this.config.stream);
            let mut streamed = String::new();
            let mut phase = StreamPhase::StreamingPrimary;
            let mut provider_used: Option<String> = None;
            let mut replayed = false;
            let mut errors: Vec<String> = Vec::new();

            loop {
                match phase {
                    StreamPhase::StreamingPrimary | StreamPhase::StreamingFallback => {
                        let index = usize::from(phase == StreamPhase::StreamingFallback);
                        let Some(adapter) = this.adapters.get(index).cloned() else {
                            phase = StreamPhase::ReplayingStatic;
                            continue;
                        };
                        let upstream_prompt = if phase == StreamPhase::StreamingPrimary {
                            prompt.clone()
                        } else {
                            continuation_prompt(&prompt, &streamed)
                        };

                        let mut upstream = match this.open_stream(&adapter, &upstream_prompt).await {
                            AttemptOutcome::Completed(upstream) => upstream,
                            AttemptOutcome::Skipped => {
                                errors.push(format!("{}: circuit open", adapter.name()));
                                phase = phase.after_failure(!streamed.is_empty());
                                continue;
                            }
                            AttemptOutcome::Failed(err) => {
                                errors.push(err.to_string());
                                phase = phase.after_failure(!streamed.is_empty());
                                continue;
                            }
                        };

                        let idle = this.config.timeouts.stream_idle;
                        let mut produced = 0usize;
                        let outcome: std::result::Result<(), LlmError> = loop {
                            match tokio::time::timeout(idle, upstream.next()).await {
                                Ok(Some(Ok(delta))) => {
                                    produced += 1;
                                    streamed.push_str(&delta);
                                    yield StreamChunk::content(id, delta, progress.advance());
                                }
                                Ok(Some(Err(err))) => break Err(err),
                                Ok(None) if produced == 0 => {
                                    break Err(LlmError::malformed("Upstream stream ended without content"));
                                }
                                Ok(None) => break Ok(()),
                                Err(_) => {
                                    break Err(LlmError::timeout(
                                        &format!("{} stream read", adapter.name()),
                                        idle,
                                    ));
                                }
                            }
                        };
                        drop(upstream);

                        match outcome {
                            Ok(()) => {
                                this.health.record_success(adapter.name());
                                provider_used = Some(adapter.name().to_string());
                                phase = StreamPhase::Done;
                            }
                            Err(err) => {
                                let err = this.record_failure(adapter.name(), err);
                                debug!(produced, "Upstream stream failed");
                                errors.push(err.to_string());
                                phase = phase.after_failure(!streamed.is_empty());
                            }
                        }
                    }
                    StreamPhase::ReplayingStatic => {
                        info!(
                            partial_chars = streamed.len(),
                            "Streaming failed, replaying single-shot generation"
                        );
                        let result = this.generate_resolved(&request, &framework).await;

                        if !result.success {
                            let message = result
                                .error_message
                                .clone()
                                .unwrap_or_else(|| "All AI providers failed".to_string());
                            warn!(error = %message, "Stream ending with error");
                            yield StreamChunk::error(id, message, Some(json!({
                                "fallback_content": result.fallback_content,
                                "stream_errors": errors,
                                "generation_time_ms": start.elapsed().as_millis() as u64,
                            })));
                            return;
                        }

                        let text = result.content.clone().unwrap_or_default();
                        for piece in split_for_replay(&text, this.config.stream.replay_max_chunks) {
                            yield StreamChunk::content(id, piece, progress.advance());
                        }
                        provider_used = result.provider_used.clone();
                        replayed = true;
                        phase = StreamPhase::Done;
                    }
                    StreamPhase::Done => {
                        yield StreamChunk::complete(id, json!({
                            "provider": provider_used,
                            "chunks": progress.chunks,
                            "replayed": replayed,
                            "generation_time_ms": start.elapsed().as_millis() as u64,
                        }));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn open_stream(&self, adapter: &SharedProvider, prompt: &str) -> AttemptOutcome<TextStream> {
        let name = adapter.name();
        if !self.health.is_model_available(name) {
            debug!(provider = %name, "Skipping stream (circuit open)");
            return AttemptOutcome::Skipped;
        }

        let operation = format!("{} stream open", name);
        match with_provider_timeout(
            self.config.timeouts.llm_request,
            adapter.generate_stream(prompt),
            &operation,
        )
        .await
        {
            Ok(upstream) => AttemptOutcome::Completed(upstream),
            Err(err) => AttemptOutcome::Failed(self.record_failure(name, err)),
        }
    }
}
