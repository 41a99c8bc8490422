//! An established TCP stream plus the readiness selector watching it.
//!
//! The stream stays in blocking mode with idle socket timeouts; all waiting
//! is bounded by the selector before any syscall is issued.

use crate::runtime::Selector;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;
use tracing::debug;

/// A single peer connection, owned by the session for one attempt.
#[derive(Debug)]
pub struct Connection {
    selector: Selector,
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    /// Wrap a connected stream, applying the per-socket idle timeout to both
    /// directions so no single syscall blocks past it.
    pub fn new(stream: TcpStream, idle_timeout: Duration) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_read_timeout(Some(idle_timeout))?;
        stream.set_write_timeout(Some(idle_timeout))?;
        let selector = Selector::new(&stream)?;

        Ok(Self {
            selector,
            stream,
            peer,
        })
    }

    /// Address of the remote end, captured when the connection was made.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Whether the socket still reports a peer.
    ///
    /// Goes false once the kernel has torn the connection down (reset,
    /// timeout); a peer that merely half-closed still counts as connected.
    pub fn is_connected(&self) -> bool {
        self.stream.peer_addr().is_ok()
    }

    /// Wait at most `wait` for the socket to accept a write.
    pub fn can_write(&mut self, wait: Duration) -> bool {
        self.selector.can_write(wait)
    }

    /// Wait at most `wait` for the socket to have data (or EOF) to read.
    pub fn can_read(&mut self, wait: Duration) -> bool {
        self.selector.can_read(wait)
    }

    /// Shut both directions down and release the socket.
    pub fn close(self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            // Already reset by the peer; nothing left to tear down.
            debug!(peer = %self.peer, error = %e, "Shutdown on close failed");
        }
        debug!(peer = %self.peer, "Connection closed");
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_connection_reports_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = TcpStream::connect(addr).unwrap();
        let (_server, _) = listener.accept().unwrap();

        let conn = Connection::new(stream, Duration::from_secs(1)).unwrap();
        assert_eq!(conn.peer(), addr);
        assert!(conn.is_connected());
    }

    #[test]
    fn test_idle_timeout_applied() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (_server, _) = listener.accept().unwrap();

        // Whole seconds survive the kernel's rounding to scheduler ticks.
        let idle = Duration::from_secs(2);
        let conn = Connection::new(stream, idle).unwrap();
        assert_eq!(conn.stream.read_timeout().unwrap(), Some(idle));
        assert_eq!(conn.stream.write_timeout().unwrap(), Some(idle));
    }

    #[test]
    fn test_close_is_observed_by_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        let conn = Connection::new(stream, Duration::from_secs(1)).unwrap();
        conn.close();

        let mut buf = [0u8; 8];
        assert_eq!(server.read(&mut buf).unwrap(), 0);
    }
}
