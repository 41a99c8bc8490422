//! Blocking socket I/O engine.
//!
//! Readiness-based, single connection at a time:
//! - `Selector`: bounded "can write" / "can read" checks over one socket
//! - `Connection`: the stream, its peer and its selector
//! - `writer` / `reader`: the send and receive phases of one message
//! - `connector`: dial out or accept one peer
//!
//! The runtime relies on mio's Unix backends (epoll on Linux, kqueue on
//! macOS) and is only built for Unix targets.

mod connection;
pub mod connector;
mod error;
mod reader;
mod selector;
mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::Connection;
pub use error::TransferError;
pub use reader::receive_response;
pub use selector::Selector;
pub use writer::send_message;
