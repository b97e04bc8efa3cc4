//! Shared types module
//!
//! This module contains shared data types and structures used throughout the application.

use std::fmt;
use std::net::SocketAddr;
use std::time::SystemTime;

/// Connection information
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Source address
    pub source: SocketAddr,
    /// Backend the connection was routed to, once classified
    pub backend: Option<SocketAddr>,
    /// Accept timestamp
    pub timestamp: SystemTime,
}

impl ConnectionInfo {
    /// Create connection info for a freshly accepted connection
    pub fn new(source: SocketAddr) -> Self {
        Self {
            source,
            backend: None,
            timestamp: SystemTime::now(),
        }
    }

    /// Milliseconds elapsed since the connection was accepted
    pub fn elapsed_ms(&self) -> u128 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.backend {
            Some(backend) => write!(f, "{} -> {}", self.source, backend),
            None => write!(f, "{} -> (unclassified)", self.source),
        }
    }
}

/// Byte counts of a finished splice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpliceStats {
    /// Bytes relayed from the client to the backend, peeked byte included
    pub client_to_backend: u64,
    /// Bytes relayed from the backend to the client
    pub backend_to_client: u64,
}
