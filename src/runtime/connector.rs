//! Connection establishment: dial out or accept one peer.
//!
//! Dial failures are expected (hosts go down, ports close) and are reported
//! as `Ok(None)` so the session can retry, and so is a listen attempt that
//! sees no peer within the socket timeout. A listen socket that cannot be
//! bound is a setup error and ends the process.

use crate::config::Tunables;
use crate::destination::Destination;
use crate::error::FatalError;
use crate::runtime::{Connection, Selector};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Open a connection for `dest` according to its mode.
pub fn open(dest: &Destination, tunables: &Tunables) -> Result<Option<Connection>, FatalError> {
    match dest {
        Destination::Dial { host, port } => Ok(dial(host, *port, tunables)),
        Destination::Listen { host, port } => accept_one(host, *port, tunables),
    }
}

fn dial(host: &str, port: u16, tunables: &Tunables) -> Option<Connection> {
    let addr = match resolve(host, port) {
        Ok(addr) => addr,
        Err(e) => {
            warn!(host, port, error = %e, "Failed to resolve destination");
            return None;
        }
    };

    let stream = match connect(addr, tunables.socket_timeout) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(addr = %addr, error = %e, "Failed to connect");
            return None;
        }
    };

    match Connection::new(stream, tunables.socket_timeout) {
        Ok(conn) => {
            info!(peer = %conn.peer(), "Connected");
            Some(conn)
        }
        Err(e) => {
            warn!(addr = %addr, error = %e, "Failed to set up connection");
            None
        }
    }
}

fn accept_one(
    host: &str,
    port: u16,
    tunables: &Tunables,
) -> Result<Option<Connection>, FatalError> {
    let bind_error = |source| FatalError::Bind {
        addr: format!("{host}:{port}"),
        source,
    };

    let addr = resolve(host, port).map_err(bind_error)?;
    let listener = create_listener(addr).map_err(bind_error)?;
    info!(addr = %addr, "Listening for a peer");

    // The listener is blocking; only accept once a peer is already queued.
    let mut selector = match Selector::new(&listener) {
        Ok(selector) => selector,
        Err(e) => {
            warn!(addr = %addr, error = %e, "Failed to watch listener");
            return Ok(None);
        }
    };
    if !selector.can_read(tunables.socket_timeout) {
        warn!(
            addr = %addr,
            waited_ms = tunables.socket_timeout.as_millis() as u64,
            "No peer connected"
        );
        return Ok(None);
    }

    let (stream, peer) = match listener.accept() {
        Ok(accepted) => accepted,
        Err(e) => {
            warn!(addr = %addr, error = %e, "Accept failed");
            return Ok(None);
        }
    };
    debug!(peer = %peer, "Accepted connection");

    match Connection::new(stream, tunables.socket_timeout) {
        Ok(conn) => {
            info!(local = %addr, peer = %conn.peer(), "Peer connected");
            Ok(Some(conn))
        }
        Err(e) => {
            warn!(peer = %peer, error = %e, "Failed to set up accepted connection");
            Ok(None)
        }
    }
}

/// First IPv4 or IPv6 address `host:port` resolves to.
fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

fn connect(addr: SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.connect_timeout(&addr.into(), timeout)?;
    socket.set_nodelay(true)?;
    Ok(socket.into())
}

/// Listener for a single peer; address reuse lets a retry rebind
/// the port while the previous connection sits in TIME_WAIT.
fn create_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1)?;
    Ok(socket.into())
}
