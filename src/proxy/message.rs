//! Control messages
//!
//! The accept loop owns all of its state. Other tasks talk to it through a
//! [`MuxHandle`], which only sends messages, so no lock is ever shared with
//! the connection tasks.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::common::{MuxError, Result};

/// Snapshot of the accept loop's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuxStatus {
    /// Connections currently being classified or spliced
    pub active_connections: usize,
    /// Connections accepted since startup
    pub total_connections: u64,
}

/// Messages that can be sent to the accept loop
#[derive(Debug)]
pub enum MuxMessage {
    /// Report the current counters
    Status {
        /// Where to send the snapshot
        reply: oneshot::Sender<MuxStatus>,
    },
    /// Stop accepting and drain in-flight connections
    Shutdown,
}

/// Lifecycle of the accept loop, published to every handle
#[derive(Debug, Clone)]
pub(crate) enum RunState {
    /// Still accepting
    Running,
    /// Shut down on request
    Stopped,
    /// Exited on a fatal error
    Failed(Arc<MuxError>),
}

impl RunState {
    fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Outcome of the accept loop once it has exited
    fn outcome(&self) -> Result<()> {
        match self {
            Self::Running | Self::Stopped => Ok(()),
            Self::Failed(e) => Err(match e.as_ref() {
                MuxError::ListenerClosed(source) => MuxError::ListenerClosed(Arc::clone(source)),
                other => MuxError::Other(other.to_string()),
            }),
        }
    }
}

/// Handle to a running multiplexer
#[derive(Debug, Clone)]
pub struct MuxHandle {
    /// Message sender
    sender: mpsc::Sender<MuxMessage>,
    /// State of the accept loop
    state: watch::Receiver<RunState>,
    /// Address the listener is bound to
    local_addr: SocketAddr,
}

impl MuxHandle {
    /// Create a new handle
    pub(crate) fn new(
        sender: mpsc::Sender<MuxMessage>,
        state: watch::Receiver<RunState>,
        local_addr: SocketAddr,
    ) -> Self {
        Self {
            sender,
            state,
            local_addr,
        }
    }

    /// Address the listener is bound to
    ///
    /// Reports the real port when the configuration asked for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Send a message to the accept loop
    pub async fn send(&self, message: MuxMessage) -> Result<()> {
        self.sender.send(message).await
            .map_err(|_| MuxError::Other("Multiplexer is no longer running".to_string()))
    }

    /// Query the accept loop's counters
    pub async fn status(&self) -> Result<MuxStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(MuxMessage::Status { reply }).await?;
        rx.await
            .map_err(|_| MuxError::Other("Multiplexer stopped before replying".to_string()))
    }

    /// Ask the accept loop to shut down
    ///
    /// Returns once the request is queued; use [`MuxHandle::wait`] to wait
    /// for the loop to exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(MuxMessage::Shutdown).await
    }

    /// Whether the accept loop has exited
    pub fn is_stopped(&self) -> bool {
        !self.state.borrow().is_running() || self.sender.is_closed()
    }

    /// Wait until the accept loop has exited
    pub async fn stopped(&self) {
        let _ = self.wait().await;
    }

    /// Wait until the accept loop has exited and return its outcome
    ///
    /// `Ok(())` after a requested shutdown, the fatal error otherwise
    /// (`MuxError::ListenerClosed` when accepting failed).
    pub async fn wait(&self) -> Result<()> {
        let mut state = self.state.clone();
        let outcome = match state.wait_for(|state| !state.is_running()).await {
            Ok(state) => state.outcome(),
            // The loop dropped its sender without publishing an outcome
            Err(_) => Err(MuxError::Other("Multiplexer task ended unexpectedly".to_string())),
        };
        outcome
    }
}

/// Create the control channel
pub(crate) fn create_channel() -> (mpsc::Sender<MuxMessage>, mpsc::Receiver<MuxMessage>) {
    mpsc::channel(16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn test_wait_reports_listener_closed() {
        let (sender, _rx) = create_channel();
        let (state_tx, state_rx) = watch::channel(RunState::Running);
        let handle = MuxHandle::new(sender, state_rx, "127.0.0.1:8080".parse().unwrap());
        assert!(!handle.is_stopped());

        let error = io::Error::new(io::ErrorKind::Other, "accept failed");
        state_tx.send(RunState::Failed(Arc::new(MuxError::ListenerClosed(Arc::new(error))))).unwrap();

        match handle.wait().await {
            Err(MuxError::ListenerClosed(e)) => assert_eq!(e.to_string(), "accept failed"),
            other => panic!("Expected ListenerClosed, got {:?}", other),
        }
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn test_wait_after_shutdown() {
        let (sender, _rx) = create_channel();
        let (state_tx, state_rx) = watch::channel(RunState::Running);
        let handle = MuxHandle::new(sender, state_rx, "127.0.0.1:8080".parse().unwrap());

        state_tx.send(RunState::Stopped).unwrap();
        assert!(handle.wait().await.is_ok());
    }
}
