//! Network utility functions
//!
//! Address parsing and listening socket setup.

use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

use super::error::{MuxError, Result};

/// Parse a socket address
///
/// Accepts a literal `ip:port` or a resolvable `host:port`. Host names are
/// resolved once, here; the first address wins.
///
/// # Arguments
///
/// * `addr` - The address string to parse
///
/// # Returns
///
/// The parsed `SocketAddr`
pub fn parse_socket_addr(addr: &str) -> Result<SocketAddr> {
    if let Ok(socket_addr) = SocketAddr::from_str(addr) {
        return Ok(socket_addr);
    }

    match addr.to_socket_addrs() {
        Ok(mut addrs) => {
            if let Some(addr) = addrs.next() {
                Ok(addr)
            } else {
                Err(MuxError::Config(format!("Failed to parse address: {}", addr)))
            }
        }
        Err(e) => Err(MuxError::Config(format!("Failed to parse address {}: {}", addr, e))),
    }
}

/// Bind a TCP listener
///
/// The socket is built with `socket2` so address reuse and the backlog can be
/// set before `listen`. Port 0 binds an ephemeral port.
pub fn bind_listener(addr: SocketAddr, backlog: u32) -> Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    if addr.port() != 0 {
        // allow quick restarts while old connections sit in TIME_WAIT
        socket.set_reuse_address(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog.min(i32::MAX as u32) as i32)?;

    let listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(listener)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_socket_addr() {
        let addr = parse_socket_addr("127.0.0.1:8080");
        assert!(addr.is_ok(), "Should be able to parse a valid address");
        assert_eq!(addr.unwrap().port(), 8080);

        let addr = parse_socket_addr("localhost:8081");
        assert!(addr.is_ok(), "Should resolve localhost");
        assert_eq!(addr.unwrap().port(), 8081);

        let addr = parse_socket_addr("invalid-address");
        assert!(addr.is_err(), "Should fail to parse an invalid address");
    }

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap(), 128).unwrap();
        let local = listener.local_addr().unwrap();
        assert_ne!(local.port(), 0);
    }
}
