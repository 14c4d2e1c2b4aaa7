//! # Configuration Modules
//!
//! Builds the explicit [`PipelineConfig`] handed to the fetcher and the
//! persistence components. Nothing else in the crate reads the environment.

/// Credential lookup and pipeline settings.
pub mod config_env;

pub use config_env::{
    ConfigError, Credentials, PipelineConfig, DEFAULT_ENDPOINT, ENV_APP_ID, ENV_APP_KEY,
};
