//! policygen - AI Compliance Policy Generation
//!
//! Generates UK regulatory compliance policies (privacy, information
//! security, incident response, ...) tailored to an organisation, using
//! hosted language models with automatic fallback.
//!
//! ## Core Features
//!
//! - **Provider Fallback**: primary and fallback providers, each behind its
//!   own circuit breaker, with a static framework template as last resort
//! - **Streaming**: chunked generation over SSE that never retracts content
//!   already sent, continuing on the fallback provider mid-document
//! - **Response Cache**: identical requests served without a provider call
//! - **Framework Catalog**: built-in UK frameworks, extendable via YAML
//!
//! ## Quick Start
//!
//! ```ignore
//! use policygen::{ConfigLoader, PolicyOrchestrator};
//!
//! let config = ConfigLoader::load()?;
//! let orchestrator = PolicyOrchestrator::from_config(&config)?;
//! let result = orchestrator.generate(&request).await?;
//! println!("{}", result.text());
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: provider adapters, circuit breakers, cache, prompts, orchestration
//! - [`frameworks`]: compliance framework catalog
//! - [`server`]: axum HTTP surface
//! - [`config`]: layered configuration
//! - [`types`]: requests, results, stream chunks, errors

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod frameworks;
pub mod server;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorCategory, LlmError, PolicyError, Result, ValidationError};

// Domain Types
pub use types::{
    BusinessContext, ChunkKind, ComplianceFramework, CustomizationLevel, GenerationRequest,
    GenerationResult, PolicyType, StreamChunk, TargetAudience, UsageEstimate,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    // Orchestration
    ChunkStream,
    // Health
    CircuitBreakerRegistry,
    CircuitState,
    HealthRegistry,
    PolicyOrchestrator,
    // Providers
    ProviderAdapter,
    ResponseCache,
    // Timeout
    TimeoutConfig,
    create_provider,
};

pub use frameworks::{FrameworkCatalog, FrameworkSource};
