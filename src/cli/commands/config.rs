//! Config Command
//!
//! Manage policygen configuration.
//!
//! Usage:
//!   policygen config show [-f json]
//!   policygen config path
//!   policygen config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(format: &str) -> Result<()> {
    ConfigLoader::show_config(format == "json")
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize global configuration
pub fn init_global(force: bool) -> Result<()> {
    let dir = ConfigLoader::init_global(force)?;
    let out = Output::new();
    out.success("Initialized global configuration");
    out.info(&format!("Directory: {}", dir.display()));
    Ok(())
}

/// Initialize project configuration in the current directory
pub fn init_project(force: bool) -> Result<()> {
    ConfigLoader::init_project(force)?;
    let out = Output::new();
    out.success("Initialized project configuration");
    out.info(&format!(
        "Config: {}",
        ConfigLoader::project_config_path().display()
    ));
    Ok(())
}
