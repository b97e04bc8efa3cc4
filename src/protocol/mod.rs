//! Protocol detection module
//!
//! Decides which backend a connection belongs to by looking at its leading
//! byte, before any protocol parsing happens.

mod detector;

pub use detector::{
    Classification, FirstByteDetector, PeekBuffer, ProtocolDetector, TLS_HANDSHAKE_RECORD,
};
