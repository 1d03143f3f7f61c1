//! # Configuration Modules
//!
//! Layered bot configuration: built-in defaults, an optional JSON file, then
//! environment variables (including a `.env` file) and CLI flags.

/// Provides system-level configuration management.
pub mod config_sys;

pub use config_sys::{layer_config, load_config, BotConfig, ConfigError, ResolvedConfig};
