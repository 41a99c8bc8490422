//! Loopback socket helpers shared by the runtime tests.

use crate::config::Tunables;
use crate::runtime::Connection;
use socket2::SockRef;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::time::Duration;

/// A client `Connection` and the raw server-side stream it talks to.
pub fn connected_pair(tunables: &Tunables) -> (Connection, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (peer, _) = listener.accept().unwrap();
    let conn = Connection::new(stream, tunables.socket_timeout).unwrap();
    (conn, peer)
}

/// Like [`connected_pair`], but the client has already shut down its sending
/// side: the connection still reports a peer and polls writable, yet every
/// write fails.
pub fn write_closed_pair(tunables: &Tunables) -> (Connection, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (peer, _) = listener.accept().unwrap();
    stream.try_clone().unwrap().shutdown(Shutdown::Write).unwrap();
    let conn = Connection::new(stream, tunables.socket_timeout).unwrap();
    (conn, peer)
}

/// Close `peer` with `SO_LINGER` 0 so the other end receives a reset.
pub fn reset_peer(peer: TcpStream) {
    SockRef::from(&peer)
        .set_linger(Some(Duration::ZERO))
        .unwrap();
    drop(peer);
}
