//! Connection handler module
//!
//! Classifies a single client connection, connects to the matching backend
//! and splices the two together.

use std::time::Duration;

use log::{debug, info};
use metrics::counter;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::common::{ConnectionInfo, MuxError, Result, SpliceStats};
use crate::config::MuxConfig;
use crate::protocol::{FirstByteDetector, ProtocolDetector};
use super::backend::BackendTable;
use super::forwarder::splice;

/// Everything a connection task needs, shared read-only between tasks
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Backend addresses
    pub backends: BackendTable,
    /// First-byte detector
    pub detector: FirstByteDetector,
    /// Backend connect timeout
    pub connect_timeout: Duration,
    /// Per-direction copy buffer size
    pub buffer_size: usize,
}

impl ConnectionContext {
    /// Build the context from configuration
    pub fn from_config(config: &MuxConfig) -> Self {
        Self {
            backends: BackendTable::from_config(config),
            detector: FirstByteDetector::new(config.classify_timeout()),
            connect_timeout: config.connect_timeout(),
            buffer_size: config.buffer_size,
        }
    }
}

/// Handle a single client connection
///
/// Nothing is ever written back to the client on failure; the connection is
/// simply dropped.
///
/// # Parameters
///
/// * `client_stream` - Accepted client stream
/// * `info` - Connection info, the chosen backend is recorded here
/// * `context` - Shared connection context
pub async fn handle_connection(
    mut client_stream: TcpStream,
    info: &mut ConnectionInfo,
    context: &ConnectionContext,
) -> Result<SpliceStats> {
    let (classification, peeked) = context.detector.detect(&mut client_stream).await?;

    let target = context.backends.target_for(classification);
    info.backend = Some(target);
    debug!("Connection {} classified as {}", info, classification);

    let backend_stream = connect_backend(target, context.connect_timeout).await?;
    counter!("sniff_mux.connections.routed", "backend" => classification.as_str()).increment(1);

    // Small writes such as the replayed byte must not sit in Nagle's buffer
    if let Err(e) = client_stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY on client {}: {}", info.source, e);
    }
    if let Err(e) = backend_stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY on backend {}: {}", target, e);
    }

    info!("Routing {} connection {}", classification, info);
    splice(client_stream, backend_stream, peeked, context.buffer_size).await
}

/// Open a connection to a backend
///
/// Failures are not retried.
async fn connect_backend(addr: std::net::SocketAddr, connect_timeout: Duration) -> Result<TcpStream> {
    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(MuxError::BackendUnreachable { addr, source }),
        Err(_) => Err(MuxError::BackendUnreachable {
            addr,
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "Connection timed out"),
        }),
    }
}
