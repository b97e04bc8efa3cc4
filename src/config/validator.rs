//! Configuration validator

use crate::config::error::{ConfigError, Result};
use crate::config::types::MuxConfig;

/// Validate the configuration
pub fn validate_config(config: &MuxConfig) -> Result<()> {
    validate_network_settings(config)?;
    validate_general_settings(config)?;

    Ok(())
}

/// Validate network settings
fn validate_network_settings(config: &MuxConfig) -> Result<()> {
    // Forwarding to ourselves would loop every connection back into the listener
    for (name, backend) in [
        ("plaintext_backend", config.plaintext_backend),
        ("tls_backend", config.tls_backend),
    ] {
        if backend == config.listen {
            return Err(ConfigError::InvalidCombination(format!(
                "Listen address and {} must be different ({})",
                name, backend
            )));
        }
    }

    if config.backlog == 0 {
        return Err(ConfigError::InvalidValue(
            "backlog".to_string(),
            "Backlog must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate general settings
fn validate_general_settings(config: &MuxConfig) -> Result<()> {
    if config.buffer_size == 0 {
        return Err(ConfigError::InvalidValue(
            "buffer_size".to_string(),
            "Buffer size must be greater than 0".to_string(),
        ));
    }

    if config.classify_timeout_ms == 0 {
        return Err(ConfigError::InvalidValue(
            "classify_timeout_ms".to_string(),
            "Classification timeout must be greater than 0".to_string(),
        ));
    }

    if config.connect_timeout == 0 {
        return Err(ConfigError::InvalidValue(
            "connect_timeout".to_string(),
            "Connection timeout must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Configuration validator trait
pub trait ConfigValidator {
    /// Validate configuration, failing on the first hard error
    fn validate(&self) -> Result<()>;

    /// Check configuration for warnings
    fn check_warnings(&self) -> Vec<String>;
}

impl ConfigValidator for MuxConfig {
    fn validate(&self) -> Result<()> {
        validate_config(self)
    }

    fn check_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        match self.log_level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            level => {
                warnings.push(format!("Invalid log level '{}', using default 'info'", level));
            }
        }

        if self.plaintext_backend == self.tls_backend {
            warnings.push(format!(
                "Plaintext and TLS backends are both {}, classification has no effect",
                self.tls_backend
            ));
        }

        if self.classify_timeout_ms > 60_000 {
            warnings.push(format!(
                "Classification timeout of {} ms lets idle clients hold sockets for a long time",
                self.classify_timeout_ms
            ));
        }

        warnings
    }
}
