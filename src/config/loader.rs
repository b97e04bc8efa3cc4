//! Configuration loader
//!
//! Sources are layered with the `config` crate, lowest priority first:
//!
//! 1. Default values (serde defaults on `MuxConfig`)
//! 2. JSON configuration file
//! 3. Environment variables prefixed with `SNIFF_MUX_`
//! 4. Command line arguments

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use log::debug;

use crate::common::parse_socket_addr;
use crate::config::defaults;
use crate::config::error::{ConfigError, Result};
use crate::config::types::{ConfigOverrides, MuxConfig};

/// Load configuration from all sources
///
/// An explicitly named file must exist. Without one, `sniff-mux.json` in the
/// working directory is used when present.
pub fn load_config(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Result<MuxConfig> {
    let mut builder = Config::builder();

    match config_file {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Json).required(true));
        }
        None => {
            builder = builder.add_source(
                File::new(defaults::DEFAULT_CONFIG_FILE, FileFormat::Json).required(false),
            );
        }
    }

    builder = builder.add_source(
        Environment::with_prefix(defaults::ENV_PREFIX)
            .try_parsing(true)
            .ignore_empty(true),
    );

    let mut config: MuxConfig = builder.build()?.try_deserialize()?;
    apply_overrides(&mut config, overrides)?;

    Ok(config)
}

/// Apply command line values on top of a loaded configuration
pub fn apply_overrides(config: &mut MuxConfig, overrides: &ConfigOverrides) -> Result<()> {
    let addr = |name: &str, value: &str| {
        parse_socket_addr(value).map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
    };

    if let Some(listen) = &overrides.listen {
        config.listen = addr("listen", listen)?;
    }
    if let Some(backend) = &overrides.plaintext_backend {
        config.plaintext_backend = addr("plaintext_backend", backend)?;
    }
    if let Some(backend) = &overrides.tls_backend {
        config.tls_backend = addr("tls_backend", backend)?;
    }
    if let Some(ms) = overrides.classify_timeout_ms {
        config.classify_timeout_ms = ms;
    }
    if let Some(secs) = overrides.connect_timeout {
        config.connect_timeout = secs;
    }
    if let Some(size) = overrides.buffer_size {
        config.buffer_size = size;
    }
    if let Some(backlog) = overrides.backlog {
        config.backlog = backlog;
    }
    if let Some(secs) = overrides.shutdown_timeout {
        config.shutdown_timeout = secs;
    }
    if let Some(level) = &overrides.log_level {
        config.log_level = level.clone();
    }

    Ok(())
}
