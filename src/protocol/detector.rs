//! First-byte protocol detector
//!
//! A TLS connection always opens with a handshake record, whose content type
//! byte is `0x16`. Looking at that one byte is enough to tell TLS apart from
//! plaintext HTTP, whose requests start with an ASCII method name.
//!
//! The byte is read off the stream, not peeked, so it is kept in a
//! [`PeekBuffer`] and must be replayed to whichever backend the connection is
//! routed to.

use std::fmt;
use std::io;
use std::time::Duration;

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::common::{MuxError, Result};

/// Content type of a TLS handshake record
pub const TLS_HANDSHAKE_RECORD: u8 = 0x16;

/// Protocol classification of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// First byte was a TLS handshake record type
    Tls,
    /// Anything else
    Plaintext,
}

impl Classification {
    /// Classify a connection by its first byte
    #[inline]
    pub fn from_first_byte(byte: u8) -> Self {
        if byte == TLS_HANDSHAKE_RECORD {
            Self::Tls
        } else {
            Self::Plaintext
        }
    }

    /// Lowercase name, used as a metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tls => "tls",
            Self::Plaintext => "plaintext",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes consumed during classification, waiting to be replayed
///
/// Holds zero or one byte. Raw sockets cannot be rewound, so the byte read
/// for classification lives here until it is written to the backend ahead of
/// anything else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeekBuffer {
    byte: Option<u8>,
}

impl PeekBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding one byte
    pub fn with_byte(byte: u8) -> Self {
        Self { byte: Some(byte) }
    }

    /// Whether the buffer has nothing left to replay
    pub fn is_empty(&self) -> bool {
        self.byte.is_none()
    }

    /// Number of buffered bytes (0 or 1)
    pub fn len(&self) -> usize {
        usize::from(self.byte.is_some())
    }

    /// Buffered bytes as a slice
    pub fn as_slice(&self) -> &[u8] {
        match &self.byte {
            Some(byte) => std::slice::from_ref(byte),
            None => &[],
        }
    }

    /// Write the buffered bytes to `writer` and empty the buffer
    ///
    /// Returns the number of bytes written. The buffer is only emptied once
    /// the write succeeded.
    pub async fn drain_into<W>(&mut self, writer: &mut W) -> io::Result<usize>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let n = self.len();
        if n > 0 {
            writer.write_all(self.as_slice()).await?;
            self.byte = None;
        }
        Ok(n)
    }
}

/// Protocol detector trait
pub trait ProtocolDetector: Send + Sync {
    /// Read enough of `stream` to classify it
    ///
    /// Returns the classification together with the bytes consumed in the
    /// process, which the caller must replay.
    #[allow(async_fn_in_trait)]
    async fn detect<S>(&self, stream: &mut S) -> Result<(Classification, PeekBuffer)>
    where
        S: AsyncRead + Unpin + Send;
}

/// Detector looking at the first byte only
#[derive(Debug, Clone)]
pub struct FirstByteDetector {
    /// How long to wait for the first byte
    timeout: Duration,
}

impl Default for FirstByteDetector {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl FirstByteDetector {
    /// Create a detector with a custom read timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Read timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ProtocolDetector for FirstByteDetector {
    async fn detect<S>(&self, stream: &mut S) -> Result<(Classification, PeekBuffer)>
    where
        S: AsyncRead + Unpin + Send,
    {
        let mut first = [0u8; 1];

        match timeout(self.timeout, stream.read(&mut first)).await {
            Ok(Ok(0)) => {
                debug!("Connection closed before sending any data");
                Err(MuxError::ClassificationRead(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before first byte",
                )))
            }
            Ok(Ok(_)) => {
                let classification = Classification::from_first_byte(first[0]);
                trace!("First byte {:#04x} classified as {}", first[0], classification);
                Ok((classification, PeekBuffer::with_byte(first[0])))
            }
            Ok(Err(e)) => {
                debug!("Error reading first byte: {}", e);
                Err(MuxError::ClassificationRead(e))
            }
            Err(_) => {
                debug!("Timeout waiting for first byte");
                Err(MuxError::ClassificationTimeout(self.timeout))
            }
        }
    }
}
