//! Single-socket readiness checks.
//!
//! Readiness-based model, as in the mio event loops: poll tells us whether
//! the socket can be written or read, then the caller performs the syscall.
//! The socket itself stays in blocking mode; only the readiness question is
//! answered here, and never with a wait longer than the one supplied.
//!
//! mio registrations are edge-triggered, so every query re-arms the interest
//! with `reregister`. Re-arming makes the backend report readiness that
//! already exists, which gives the level semantics of `select(2)`.

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;
use tracing::debug;

const SOCKET_TOKEN: Token = Token(0);

/// Readiness multiplexer bound to one socket descriptor.
pub struct Selector {
    poll: Poll,
    events: Events,
    fd: RawFd,
}

impl Selector {
    /// Register `source` with a fresh poll instance.
    ///
    /// The caller keeps ownership of the socket and must keep it open for as
    /// long as the selector is used.
    pub fn new(source: &impl AsRawFd) -> io::Result<Self> {
        let poll = Poll::new()?;
        let fd = source.as_raw_fd();
        poll.registry()
            .register(&mut SourceFd(&fd), SOCKET_TOKEN, Interest::READABLE)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(4),
            fd,
        })
    }

    /// Whether the socket becomes writable within `wait`.
    pub fn can_write(&mut self, wait: Duration) -> bool {
        self.wait_for(Interest::WRITABLE, wait)
    }

    /// Whether the socket becomes readable within `wait`.
    pub fn can_read(&mut self, wait: Duration) -> bool {
        self.wait_for(Interest::READABLE, wait)
    }

    fn wait_for(&mut self, interest: Interest, wait: Duration) -> bool {
        if let Err(e) =
            self.poll
                .registry()
                .reregister(&mut SourceFd(&self.fd), SOCKET_TOKEN, interest)
        {
            debug!(fd = self.fd, error = %e, "Failed to re-arm readiness interest");
            return false;
        }

        match self.poll.poll(&mut self.events, Some(wait)) {
            Ok(()) => {}
            Err(e) => {
                // EINTR and friends: report "not yet" and let the caller retry.
                debug!(fd = self.fd, error = %e, "Readiness poll failed");
                return false;
            }
        }

        let writable = interest.is_writable();
        self.events.iter().any(|event| {
            if event.token() != SOCKET_TOKEN {
                return false;
            }
            // Hang-up and error count as ready so the next syscall sees them.
            if writable {
                event.is_writable() || event.is_write_closed() || event.is_error()
            } else {
                event.is_readable() || event.is_read_closed() || event.is_error()
            }
        })
    }
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector").field("fd", &self.fd).finish()
    }
}
