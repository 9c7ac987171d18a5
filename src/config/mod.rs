//! Configuration Management
//!
//! Hierarchical resolution, later sources win:
//! 1. Built-in defaults
//! 2. Global config (~/.config/policygen/config.toml)
//! 3. Project config (.policygen/config.toml)
//! 4. Environment variables (POLICYGEN_*)
//! 5. CLI arguments

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
