//! Configuration module
//!
//! This module handles application configuration, including loading from
//! different sources (files, environment variables, command line arguments)
//! and validating the configuration.

mod defaults;
mod error;
mod loader;
mod types;
mod validator;

pub use self::defaults::{
    DEFAULT_CONFIG_FILE, ENV_PREFIX, LISTEN_STR, LOG_LEVEL_STR, PLAINTEXT_BACKEND_STR,
    TLS_BACKEND_STR,
};
pub use self::error::ConfigError;
pub use self::loader::{apply_overrides, load_config};
pub use self::types::{ConfigOverrides, MuxConfig};
pub use self::validator::{validate_config, ConfigValidator};
