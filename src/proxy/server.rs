//! Multiplexer server module
//!
//! Owns the listener and the accept loop. Every accepted connection gets its
//! own task; the loop itself never waits on a connection.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use metrics::{counter, gauge};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::common::{bind_listener, ConnectionInfo, MuxError, Result};
use crate::config::MuxConfig;
use super::handler::{handle_connection, ConnectionContext};
use super::message::{create_channel, MuxHandle, MuxMessage, MuxStatus, RunState};

/// Source of inbound connections for the accept loop
pub(crate) trait Accept {
    /// Address the source is bound to
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Wait for the next connection
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Accept for TcpListener {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }

    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Connection sniffer and router
///
/// Listens on one port and routes each connection to the plaintext or TLS
/// backend based on its first byte.
pub struct Mux {
    /// Multiplexer configuration
    config: Arc<MuxConfig>,
    /// Read-only state handed to every connection task
    context: Arc<ConnectionContext>,
}

/// Mutable state of the accept loop
struct MuxState {
    /// Connection tasks
    tasks: JoinSet<()>,
    /// Number of active connections
    active_connections: usize,
    /// Connections accepted since startup
    total_connections: u64,
}

impl MuxState {
    fn status(&self) -> MuxStatus {
        MuxStatus {
            active_connections: self.active_connections,
            total_connections: self.total_connections,
        }
    }

    fn task_finished(&mut self, result: std::result::Result<(), tokio::task::JoinError>) {
        self.active_connections = self.active_connections.saturating_sub(1);
        gauge!("sniff_mux.connections.active").set(self.active_connections as f64);

        if let Err(e) = result {
            error!("Task error: {}", e);
        }
    }
}

impl Mux {
    /// Create a new multiplexer
    pub fn new(config: MuxConfig) -> Self {
        let context = ConnectionContext::from_config(&config);
        Self {
            config: Arc::new(config),
            context: Arc::new(context),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Bind the listener
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(&self) -> Result<TcpListener> {
        bind_listener(self.config.listen, self.config.backlog)
    }

    /// Bind and run the accept loop in the current task
    ///
    /// Only returns on a fatal listener error.
    pub async fn run(self) -> Result<()> {
        let listener = self.bind()?;
        let (_sender, rx) = create_channel();

        self.serve(listener, rx).await
    }

    /// Bind the listener and spawn the accept loop
    ///
    /// Must be called from within a tokio runtime. Binding errors are
    /// returned here; everything after that is driven through the handle,
    /// and [`MuxHandle::wait`] reports how the loop ended.
    pub fn start(self) -> Result<MuxHandle> {
        let listener = self.bind()?;
        self.spawn(listener)
    }

    /// Spawn the accept loop over an already bound listener
    pub(crate) fn spawn<L>(self, listener: L) -> Result<MuxHandle>
    where
        L: Accept + Send + Sync + 'static,
    {
        let local_addr = listener.local_addr()?;

        let (sender, rx) = create_channel();
        let (state_tx, state_rx) = watch::channel(RunState::Running);

        tokio::spawn(async move {
            let state = match self.serve(listener, rx).await {
                Ok(()) => RunState::Stopped,
                Err(e) => {
                    error!("Multiplexer stopped: {}", e);
                    RunState::Failed(Arc::new(e))
                }
            };
            let _ = state_tx.send(state);
        });

        Ok(MuxHandle::new(sender, state_rx, local_addr))
    }

    /// The accept loop
    async fn serve<L: Accept>(self, listener: L, mut rx: mpsc::Receiver<MuxMessage>) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("Multiplexer listening on {}", local_addr);
        info!("Plaintext backend: {}", self.context.backends.plaintext);
        info!("TLS backend: {}", self.context.backends.tls);

        let mut state = MuxState {
            tasks: JoinSet::new(),
            active_connections: 0,
            total_connections: 0,
        };
        let mut control_open = true;

        let outcome = loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((client_stream, client_addr)) => {
                            debug!("Accepted connection from {}", client_addr);
                            state.active_connections += 1;
                            state.total_connections += 1;
                            counter!("sniff_mux.connections.total").increment(1);
                            gauge!("sniff_mux.connections.active").set(state.active_connections as f64);

                            let context = Arc::clone(&self.context);
                            state.tasks.spawn(async move {
                                let mut info = ConnectionInfo::new(client_addr);
                                match handle_connection(client_stream, &mut info, &context).await {
                                    Ok(stats) => debug!(
                                        "Connection {} finished after {} ms ({} bytes up, {} bytes down)",
                                        info, info.elapsed_ms(), stats.client_to_backend, stats.backend_to_client
                                    ),
                                    Err(e) => {
                                        counter!("sniff_mux.connections.failed", "reason" => e.reason()).increment(1);
                                        match &e {
                                            MuxError::BackendUnreachable { .. } => warn!("Connection {} dropped: {}", info, e),
                                            _ => debug!("Connection {} dropped: {}", info, e),
                                        }
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            break Err(MuxError::ListenerClosed(Arc::new(e)));
                        }
                    }
                }

                message = rx.recv(), if control_open => {
                    match message {
                        Some(MuxMessage::Status { reply }) => {
                            let _ = reply.send(state.status());
                        }
                        Some(MuxMessage::Shutdown) => {
                            info!("Received shutdown message");
                            break Ok(());
                        }
                        // Every handle is gone, keep serving until a fatal error
                        None => control_open = false,
                    }
                }

                Some(result) = state.tasks.join_next() => {
                    state.task_finished(result);
                }
            }
        };

        // Stop accepting before draining
        drop(listener);

        if outcome.is_ok() {
            self.drain(&mut state, self.config.shutdown_timeout()).await;
        }

        info!("Multiplexer on {} shut down", local_addr);
        outcome
    }

    /// Wait for in-flight connections, aborting whatever is left at the deadline
    async fn drain(&self, state: &mut MuxState, deadline: Duration) {
        if state.active_connections > 0 {
            info!("Waiting for {} connections to complete...", state.active_connections);
        }

        let wait_all = async {
            while let Some(result) = state.tasks.join_next().await {
                state.task_finished(result);
            }
        };

        if tokio::time::timeout(deadline, wait_all).await.is_err() {
            warn!(
                "Shutdown timeout reached, aborting {} connections",
                state.active_connections
            );
            state.tasks.shutdown().await;
            state.active_connections = 0;
        }
    }
}
