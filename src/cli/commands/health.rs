//! Health Command
//!
//! Show configured providers with their breaker state; `--check` also
//! probes each provider endpoint.

use std::path::Path;
use std::time::Duration;

use crate::ai::timeout::with_timeout;
use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::types::Result;

pub async fn run(check: bool, config_path: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let out = Output::new();

    out.header("Providers");
    for stats in ctx.orchestrator.provider_health() {
        out.breaker(&stats);
    }

    if !check {
        return Ok(());
    }

    out.header("Connectivity");
    let timeout = Duration::from_secs(ctx.config.llm.timeout_secs);
    for provider in ctx.orchestrator.providers() {
        let label = format!("{} ({})", provider.name(), provider.model());
        match with_timeout(timeout, provider.health_check(), "health check").await {
            Ok(true) => out.success(&label),
            Ok(false) => out.warning(&format!("{}: endpoint rejected the request", label)),
            Err(e) => out.error(&format!("{}: {}", label, e)),
        }
    }
    Ok(())
}
