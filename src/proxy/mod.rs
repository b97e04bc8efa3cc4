//! Proxy module
//!
//! Accepts connections on a single port, classifies each one by its first
//! byte and splices it to the plaintext or TLS backend.
//!
//! The accept loop owns its state and is controlled through messages, so
//! connection tasks never share anything mutable.

mod backend;
mod forwarder;
mod handler;
mod message;
pub mod server;

pub use backend::BackendTable;
pub use forwarder::splice;
pub use handler::{handle_connection, ConnectionContext};
pub use message::{MuxHandle, MuxMessage, MuxStatus};
pub use server::Mux;
