//! Sniff Mux: one port for both HTTP and HTTPS
//!
//! A TCP multiplexer for local development setups. It listens on a single
//! port and looks at the first byte of every connection: a TLS handshake
//! record (`0x16`) goes to the TLS backend, anything else to the plaintext
//! backend. Neither protocol is parsed or terminated; bytes are relayed
//! unmodified in both directions, the sniffed byte included.
//!
//! # Example
//!
//! ```no_run
//! use sniff_mux::{Mux, Result};
//! use sniff_mux::config::MuxConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = MuxConfig {
//!         listen: "127.0.0.1:8080".parse().unwrap(),
//!         plaintext_backend: "127.0.0.1:8081".parse().unwrap(),
//!         tls_backend: "127.0.0.1:8082".parse().unwrap(),
//!         ..MuxConfig::default()
//!     };
//!
//!     let handle = Mux::new(config).start()?;
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await?;
//!     handle.wait().await
//! }
//! ```

pub mod common;
pub mod config;
pub mod protocol;
pub mod proxy;

// Re-export commonly used structures and functions for convenience
pub use common::{init_logger, parse_socket_addr, MuxError, Result};
pub use protocol::{Classification, PeekBuffer, TLS_HANDSHAKE_RECORD};
pub use proxy::{Mux, MuxHandle};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
