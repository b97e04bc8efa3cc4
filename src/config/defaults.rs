//! Default configuration values
//!
//! Single source of truth for defaults. The ports follow the usual local
//! development layout: one public port, plaintext backend on the next port,
//! TLS backend on the one after.

use std::net::SocketAddr;

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "SNIFF_MUX";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "sniff-mux.json";

/// Default listen address as string
pub const LISTEN_STR: &str = "0.0.0.0:8080";

/// Default plaintext backend address as string
pub const PLAINTEXT_BACKEND_STR: &str = "127.0.0.1:8081";

/// Default TLS backend address as string
pub const TLS_BACKEND_STR: &str = "127.0.0.1:8082";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// Default listen address
pub fn listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Default plaintext backend address
pub fn plaintext_backend() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8081))
}

/// Default TLS backend address
pub fn tls_backend() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8082))
}

/// Default classification timeout in milliseconds
pub fn classify_timeout_ms() -> u64 {
    5000
}

/// Default backend connect timeout in seconds
pub fn connect_timeout() -> u64 {
    30
}

/// Default buffer size (8KB)
pub fn buffer_size() -> usize {
    8192
}

/// Default listen backlog
pub fn backlog() -> u32 {
    1024
}

/// Default drain period on shutdown in seconds
pub fn shutdown_timeout() -> u64 {
    30
}

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}
