//! Serve Command
//!
//! Run the HTTP API.

use std::path::Path;

use crate::cli::CommandContext;
use crate::server::{self, AppState};
use crate::types::Result;

pub async fn run(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut ctx = CommandContext::load(config_path)?;
    if let Some(host) = host {
        ctx.config.server.host = host;
    }
    if let Some(port) = port {
        ctx.config.server.port = port;
    }

    let names: Vec<&str> = ctx.orchestrator.providers().iter().map(|p| p.name()).collect();
    tracing::info!(providers = ?names, "Provider order");

    let bind_address = ctx.config.server.bind_address();
    server::serve(AppState::new(ctx.orchestrator), &bind_address).await
}
