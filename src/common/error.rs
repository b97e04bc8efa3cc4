//! Error handling module
//!
//! This module defines the error types and result type aliases used in the application.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Sniff mux error type
///
/// Only `ListenerClosed` and `Io` (raised while binding) are fatal for the
/// multiplexer. Every other variant describes the failure of one connection.
#[derive(Error, Debug)]
pub enum MuxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The listener stopped accepting connections
    ///
    /// Shared so every handle to a stopped multiplexer can report it.
    #[error("Listener closed: {0}")]
    ListenerClosed(Arc<io::Error>),

    /// No byte arrived before the classification deadline
    #[error("No data received within {0:?}, cannot classify connection")]
    ClassificationTimeout(Duration),

    /// Reading the first byte failed (including immediate EOF)
    #[error("Failed to read first byte: {0}")]
    ClassificationRead(io::Error),

    /// The selected backend could not be reached
    #[error("Backend {addr} unreachable: {source}")]
    BackendUnreachable {
        /// Backend address
        addr: SocketAddr,
        /// Underlying connect error
        source: io::Error,
    },

    /// An I/O error while relaying bytes
    #[error("Splice error: {0}")]
    SpliceIo(io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

impl MuxError {
    /// Whether the error only concerns a single connection
    pub fn is_connection_local(&self) -> bool {
        matches!(
            self,
            Self::ClassificationTimeout(_)
                | Self::ClassificationRead(_)
                | Self::BackendUnreachable { .. }
                | Self::SpliceIo(_)
        )
    }

    /// Short label used for metrics and log lines
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::ListenerClosed(_) => "listener_closed",
            Self::ClassificationTimeout(_) => "classification_timeout",
            Self::ClassificationRead(_) => "classification_read",
            Self::BackendUnreachable { .. } => "backend_unreachable",
            Self::SpliceIo(_) => "splice_io",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `MuxError`.
pub type Result<T> = std::result::Result<T, MuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::AddrInUse, "Address in use");
        let mux_err: MuxError = io_err.into();

        match mux_err {
            MuxError::Io(_) => {}
            _ => panic!("Should convert to IO error"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = MuxError::BackendUnreachable {
            addr: "127.0.0.1:8082".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        let err_str = err.to_string();
        assert!(err_str.contains("127.0.0.1:8082"));
        assert!(err_str.contains("refused"));
    }

    #[test]
    fn test_connection_local_errors() {
        assert!(MuxError::ClassificationTimeout(Duration::from_secs(5)).is_connection_local());
        assert!(MuxError::SpliceIo(io::ErrorKind::BrokenPipe.into()).is_connection_local());
        assert!(!MuxError::ListenerClosed(Arc::new(io::ErrorKind::Other.into())).is_connection_local());
        assert!(!MuxError::Config("bad".to_string()).is_connection_local());
    }
}
