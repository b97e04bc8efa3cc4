//! Configuration types

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::common::parse_socket_addr;
use crate::config::defaults;

/// Custom deserializer for socket addresses
///
/// Accepts host names as well as literal addresses.
fn deserialize_socket_addr<'de, D>(deserializer: D) -> std::result::Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_socket_addr(&s).map_err(serde::de::Error::custom)
}

/// Multiplexer configuration
///
/// Every field has a default, so a partial file or a handful of environment
/// variables is enough to build a complete configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MuxConfig {
    // --- Network settings ---

    /// Public address the multiplexer listens on
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub listen: SocketAddr,

    /// Backend receiving connections whose first byte is not a TLS handshake
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub plaintext_backend: SocketAddr,

    /// Backend receiving TLS connections
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub tls_backend: SocketAddr,

    /// Listen backlog
    pub backlog: u32,

    // --- Timing ---

    /// How long to wait for the first byte, in milliseconds
    pub classify_timeout_ms: u64,

    /// Backend connect timeout in seconds
    pub connect_timeout: u64,

    /// Drain period for in-flight connections on shutdown, in seconds
    pub shutdown_timeout: u64,

    // --- General settings ---

    /// Per-direction relay buffer size in bytes
    pub buffer_size: usize,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            listen: defaults::listen(),
            plaintext_backend: defaults::plaintext_backend(),
            tls_backend: defaults::tls_backend(),
            backlog: defaults::backlog(),
            classify_timeout_ms: defaults::classify_timeout_ms(),
            connect_timeout: defaults::connect_timeout(),
            shutdown_timeout: defaults::shutdown_timeout(),
            buffer_size: defaults::buffer_size(),
            log_level: defaults::log_level(),
        }
    }
}

impl MuxConfig {
    /// Classification timeout as a `Duration`
    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }

    /// Backend connect timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Shutdown drain period as a `Duration`
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

/// Values given on the command line
///
/// `None` leaves the value from the lower layers untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Listen address
    pub listen: Option<String>,
    /// Plaintext backend address
    pub plaintext_backend: Option<String>,
    /// TLS backend address
    pub tls_backend: Option<String>,
    /// Classification timeout in milliseconds
    pub classify_timeout_ms: Option<u64>,
    /// Connect timeout in seconds
    pub connect_timeout: Option<u64>,
    /// Buffer size in bytes
    pub buffer_size: Option<usize>,
    /// Listen backlog
    pub backlog: Option<u32>,
    /// Shutdown drain timeout in seconds
    pub shutdown_timeout: Option<u64>,
    /// Log level
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MuxConfig = serde_json::from_str(r#"{ "tls_backend": "127.0.0.1:9443" }"#).unwrap();
        assert_eq!(config.tls_backend.port(), 9443);
        assert_eq!(config.plaintext_backend, defaults::plaintext_backend());
        assert_eq!(config.classify_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_host_name_backend() {
        let config: MuxConfig = serde_json::from_str(r#"{ "plaintext_backend": "localhost:9080" }"#).unwrap();
        assert_eq!(config.plaintext_backend.port(), 9080);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let result = serde_json::from_str::<MuxConfig>(r#"{ "listen": "not an address" }"#);
        assert!(result.is_err());
    }
}
