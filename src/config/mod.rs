//! Configuration management for tunebox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs, mirror lists from built-in tables)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use tunebox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `TUNEBOX__<section>__<key>`
//!
//! Examples:
//! - `TUNEBOX__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `TUNEBOX__FLEET__RACE_WIDTH=4`
//! - `TUNEBOX__PROBE__DECIPHER_HELPER=https://helper.example/decipher`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/tunebox.toml`.
//! This can be overridden using the `TUNEBOX_CONFIG` environment variable.

mod mirrors;
mod models;
mod sources;
mod validation;

pub use mirrors::MirrorTable;
pub use models::{
    Config, FallbackConfig, FleetConfig, HttpSettings, MirrorConfig, NativeConfig, ProbeConfig,
    ServerConfig, TimeoutConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`TUNEBOX__*`)
    /// 2. TOML file (default: `config/tunebox.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Freeze the configured mirror lists into shared immutable tables
    pub fn mirror_table(&self) -> MirrorTable {
        MirrorTable::from_config(&self.mirrors)
    }
}
