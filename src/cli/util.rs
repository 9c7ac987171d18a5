//! CLI Common Utilities
//!
//! Shared configuration loading and orchestrator wiring for CLI commands.

use std::path::Path;

use crate::ai::PolicyOrchestrator;
use crate::config::{Config, ConfigLoader};
use crate::types::Result;

/// Command execution context
///
/// Created via `CommandContext::load()` for commands that talk to providers,
/// or via [`load_config`] for commands that only need settings.
#[derive(Clone)]
pub struct CommandContext {
    /// Loaded configuration
    pub config: Config,
    /// Orchestrator wired from `config`
    pub orchestrator: PolicyOrchestrator,
}

impl CommandContext {
    /// Load config and build providers, breakers, cache and catalog
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        let orchestrator = PolicyOrchestrator::from_config(&config)?;
        Ok(Self {
            config,
            orchestrator,
        })
    }
}

/// Effective configuration: an explicit file replaces the global/project
/// lookup, environment variables apply either way
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}
