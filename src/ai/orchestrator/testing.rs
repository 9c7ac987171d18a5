//! Scripted provider for orchestrator and server tests

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::PolicyOrchestrator;
use crate::ai::provider::{
    CircuitBreakerConfig, CircuitBreakerRegistry, ErrorCategory, LlmError, ProviderAdapter,
    ProviderCompletion, TextStream,
};
use crate::frameworks::FrameworkCatalog;
use crate::types::Result;

/// What `generate_stream` does
#[derive(Debug, Clone)]
pub(crate) enum StreamScript {
    /// Opening the stream fails
    OpenFails,
    /// Yields the deltas, then ends normally
    Yields(Vec<String>),
    /// Yields the deltas, then fails
    YieldsThenFails(Vec<String>),
    /// Yields the deltas, then never produces another item
    YieldsThenHangs(Vec<String>),
}

/// Sets the flag when the upstream stream is dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct MockProvider {
    name: String,
    completion: Option<String>,
    stream: StreamScript,
    delay: Option<Duration>,
    generate_calls: AtomicU32,
    stream_calls: AtomicU32,
    stream_dropped: Arc<AtomicBool>,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Fails everything until scripted otherwise
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            completion: None,
            stream: StreamScript::OpenFails,
            delay: None,
            generate_calls: AtomicU32::new(0),
            stream_calls: AtomicU32::new(0),
            stream_dropped: Arc::new(AtomicBool::new(false)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn completes(mut self, text: &str) -> Self {
        self.completion = Some(text.to_string());
        self
    }

    pub(crate) fn streams(mut self, script: StreamScript) -> Self {
        self.stream = script;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn generate_calls(&self) -> u32 {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stream_calls(&self) -> u32 {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }

    /// Prompts received by `generate_stream`, in order
    pub(crate) fn stream_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn error(&self, message: &str) -> LlmError {
        LlmError::with_provider(ErrorCategory::Transient, message, self.name.clone())
    }
}

fn owned(deltas: &[&str]) -> Vec<String> {
    deltas.iter().map(|d| d.to_string()).collect()
}

impl StreamScript {
    pub(crate) fn yields(deltas: &[&str]) -> Self {
        Self::Yields(owned(deltas))
    }

    pub(crate) fn yields_then_fails(deltas: &[&str]) -> Self {
        Self::YieldsThenFails(owned(deltas))
    }

    pub(crate) fn yields_then_hangs(deltas: &[&str]) -> Self {
        Self::YieldsThenHangs(owned(deltas))
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn generate(&self, _prompt: &str) -> std::result::Result<ProviderCompletion, LlmError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.completion {
            Some(text) => Ok(ProviderCompletion::text_only(text.clone())),
            None => Err(self.error("scripted generate failure")),
        }
    }

    async fn generate_stream(&self, prompt: &str) -> std::result::Result<TextStream, LlmError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(prompt.to_string());

        let (deltas, then) = match &self.stream {
            StreamScript::OpenFails => return Err(self.error("scripted stream open failure")),
            StreamScript::Yields(d) => (d.clone(), None),
            StreamScript::YieldsThenFails(d) => (d.clone(), Some(false)),
            StreamScript::YieldsThenHangs(d) => (d.clone(), Some(true)),
        };

        let guard = DropFlag(self.stream_dropped.clone());
        let failure = self.error("scripted mid-stream failure");
        let stream = async_stream::stream! {
            let _guard = guard;
            for delta in deltas {
                yield Ok(delta);
            }
            match then {
                Some(true) => futures::future::pending::<()>().await,
                Some(false) => {
                    yield Err(failure);
                }
                None => {}
            }
        };
        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn cost_per_1k_tokens(&self) -> f64 {
        0.01
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.completion.is_some())
    }
}

/// Orchestrator over a primary and a fallback mock with the builtin catalog
pub(crate) fn orchestrator_with(
    primary: MockProvider,
    fallback: MockProvider,
) -> (PolicyOrchestrator, Arc<MockProvider>, Arc<MockProvider>) {
    orchestrator_with_breakers(primary, fallback, CircuitBreakerConfig::default())
}

pub(crate) fn orchestrator_with_breakers(
    primary: MockProvider,
    fallback: MockProvider,
    breakers: CircuitBreakerConfig,
) -> (PolicyOrchestrator, Arc<MockProvider>, Arc<MockProvider>) {
    let primary = Arc::new(primary);
    let fallback = Arc::new(fallback);

    let orchestrator = PolicyOrchestrator::builder(Arc::new(FrameworkCatalog::builtin()))
        .provider(primary.clone())
        .provider(fallback.clone())
        .health(CircuitBreakerRegistry::shared(breakers))
        .build()
        .expect("two distinct providers");

    (orchestrator, primary, fallback)
}
