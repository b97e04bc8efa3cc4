//! Backend address table

use std::net::SocketAddr;

use crate::config::MuxConfig;
use crate::protocol::Classification;

/// The two fixed backends a connection can be routed to
///
/// Built once at startup and shared read-only between connection tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTable {
    /// Backend for plaintext connections
    pub plaintext: SocketAddr,
    /// Backend for TLS connections
    pub tls: SocketAddr,
}

impl BackendTable {
    /// Create a backend table
    pub fn new(plaintext: SocketAddr, tls: SocketAddr) -> Self {
        Self { plaintext, tls }
    }

    /// Backend table from configuration
    pub fn from_config(config: &MuxConfig) -> Self {
        Self::new(config.plaintext_backend, config.tls_backend)
    }

    /// Address for a classification
    #[inline]
    pub fn target_for(&self, classification: Classification) -> SocketAddr {
        match classification {
            Classification::Tls => self.tls,
            Classification::Plaintext => self.plaintext,
        }
    }
}
