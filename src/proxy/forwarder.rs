//! Data forwarding module
//!
//! Splices an inbound connection to its backend. The peeked byte goes out
//! first, then both directions are copied concurrently. Whichever direction
//! finishes first ends the splice: the other copy loop is dropped and both
//! write halves are shut down, so neither side is left hanging.
//!
//! Half-close is not preserved. A client that shuts down its write side after
//! sending a request ends the splice at that EOF, and a response the backend
//! sends afterwards is dropped. The backend sees the close as EOF.

use std::io;

use log::{debug, trace};
use metrics::counter;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::{MuxError, Result, SpliceStats};
use crate::protocol::PeekBuffer;

/// Copy from `reader` to `writer` until EOF or error
///
/// `total` is updated after every successful write so the count survives
/// cancellation.
async fn relay<R, W>(reader: &mut R, writer: &mut W, buffer_size: usize, total: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size];

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buffer[..n]).await?;
        *total += n as u64;
    }
}

/// Splice two streams together
///
/// # Parameters
///
/// * `inbound` - Client stream, already missing the peeked bytes
/// * `outbound` - Backend stream
/// * `peeked` - Bytes consumed during classification
/// * `buffer_size` - Per-direction copy buffer size
///
/// # Returns
///
/// Byte counts for both directions. An I/O error in either direction is
/// reported as `MuxError::SpliceIo`; both streams are closed either way.
pub async fn splice<C, B>(
    inbound: C,
    outbound: B,
    mut peeked: PeekBuffer,
    buffer_size: usize,
) -> Result<SpliceStats>
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_reader, mut client_writer) = tokio::io::split(inbound);
    let (mut backend_reader, mut backend_writer) = tokio::io::split(outbound);

    let mut stats = SpliceStats::default();

    // The backend has to see the stream exactly as the client sent it
    match peeked.drain_into(&mut backend_writer).await {
        Ok(n) => stats.client_to_backend = n as u64,
        Err(e) => return Err(MuxError::SpliceIo(e)),
    }

    let outcome = {
        let client_to_backend = relay(
            &mut client_reader,
            &mut backend_writer,
            buffer_size,
            &mut stats.client_to_backend,
        );
        let backend_to_client = relay(
            &mut backend_reader,
            &mut client_writer,
            buffer_size,
            &mut stats.backend_to_client,
        );

        tokio::select! {
            result = client_to_backend => {
                trace!("Client to backend direction finished first");
                result
            }
            result = backend_to_client => {
                trace!("Backend to client direction finished first");
                result
            }
        }
    };

    // Best effort: the peer may already be gone
    let _ = backend_writer.shutdown().await;
    let _ = client_writer.shutdown().await;

    counter!("sniff_mux.bytes", "direction" => "client_to_backend").increment(stats.client_to_backend);
    counter!("sniff_mux.bytes", "direction" => "backend_to_client").increment(stats.backend_to_client);

    debug!(
        "Splice closed: {} bytes client to backend, {} bytes backend to client",
        stats.client_to_backend, stats.backend_to_client
    );

    outcome.map(|_| stats).map_err(MuxError::SpliceIo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::duplex;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_peeked_byte_goes_first() {
        let (mut client, inbound) = duplex(1024);
        let (outbound, mut backend) = duplex(1024);

        let task = tokio::spawn(splice(inbound, outbound, PeekBuffer::with_byte(b'G'), 16));

        client.write_all(b"ET / HTTP/1.1\r\n\r\n").await.unwrap();
        drop(client);

        let mut received = Vec::new();
        backend.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"GET / HTTP/1.1\r\n\r\n");

        let stats = task.await.unwrap().unwrap();
        assert_eq!(stats.client_to_backend, received.len() as u64);
    }

    #[tokio::test]
    async fn test_both_directions() {
        let (mut client, inbound) = duplex(1024);
        let (outbound, mut backend) = duplex(1024);

        let task = tokio::spawn(splice(inbound, outbound, PeekBuffer::with_byte(0x16), 8));

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 5];
        backend.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"\x16ping");

        backend.write_all(b"pong").await.unwrap();
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        drop(backend);
        let stats = timeout(Duration::from_secs(1), task).await.unwrap().unwrap().unwrap();
        assert_eq!(stats, SpliceStats { client_to_backend: 5, backend_to_client: 4 });
    }

    #[tokio::test]
    async fn test_backend_close_ends_client_side() {
        let (mut client, inbound) = duplex(1024);
        let (outbound, backend) = duplex(1024);

        let task = tokio::spawn(splice(inbound, outbound, PeekBuffer::new(), 8));
        drop(backend);

        // The client sees EOF even though it never closed its own side
        let mut buf = Vec::new();
        timeout(Duration::from_secs(1), client.read_to_end(&mut buf))
            .await
            .expect("client side should be closed")
            .unwrap();
        assert!(buf.is_empty());

        timeout(Duration::from_secs(1), task).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_client_half_close_ends_splice() {
        let (mut client, inbound) = duplex(1024);
        let (outbound, mut backend) = duplex(1024);

        let task = tokio::spawn(splice(inbound, outbound, PeekBuffer::with_byte(b'G'), 8));

        client.write_all(b"ET /").await.unwrap();
        client.shutdown().await.unwrap();

        let mut request = Vec::new();
        timeout(Duration::from_secs(1), backend.read_to_end(&mut request))
            .await
            .expect("backend should see EOF")
            .unwrap();
        assert_eq!(request, b"GET /");

        let stats = timeout(Duration::from_secs(1), task).await.unwrap().unwrap().unwrap();
        assert_eq!(stats.backend_to_client, 0);

        // A response after the half-close has nowhere to go
        assert!(backend.write_all(b"HTTP/1.1 200 OK\r\n\r\n").await.is_err());
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());
    }
}
