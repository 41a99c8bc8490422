//! Receive phase: drain one response from the socket into the output sink.
//!
//! Line-oriented protocols rarely mark the end of a response, so the read is
//! considered complete when a round yields nothing new and either something
//! was already received or the overall timeout has run out. A slow peer and
//! a finished peer look the same to this heuristic.

use crate::config::Tunables;
use crate::runtime::{Connection, TransferError};
use std::io::{self, Read, Write};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Read from `conn` into `sink` until the response is judged complete.
///
/// Returns the number of bytes appended to `sink`. A call that ends without
/// receiving anything is a [`TransferError::ReadTimeout`], never `Ok(0)`.
pub fn receive_response(
    conn: &mut Connection,
    sink: &mut dyn Write,
    tunables: &Tunables,
) -> Result<usize, TransferError> {
    let peer = conn.peer();
    let started = Instant::now();
    let drained = drain(conn, sink, tunables, started)?;

    if drained.total == 0 {
        let err = TransferError::ReadTimeout;
        warn!(
            peer = %peer,
            code = err.code(),
            rounds = drained.rounds,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Receive failed: no data"
        );
        return Err(err);
    }

    sink.flush().map_err(TransferError::Sink)?;
    info!(bytes = drained.total, peer = %peer, "Received response");
    Ok(drained.total)
}

/// Bytes moved and readiness rounds spent by one [`drain`].
#[derive(Debug, Clone, Copy)]
struct Drained {
    total: usize,
    rounds: u32,
}

fn drain(
    conn: &mut Connection,
    sink: &mut dyn Write,
    tunables: &Tunables,
    started: Instant,
) -> Result<Drained, TransferError> {
    let peer = conn.peer();
    let mut chunk = vec![0u8; tunables.read_chunk];
    let mut total = 0usize;
    let mut rounds = 0u32;

    loop {
        rounds += 1;
        if !conn.is_connected() {
            let err = TransferError::ConnLost;
            warn!(peer = %peer, code = err.code(), received = total, "Receive failed: connection lost");
            return Err(err);
        }

        let readable = conn.can_read(tunables.select_wait);
        let mut round = 0usize;

        if readable {
            round = match conn.read(&mut chunk) {
                Ok(n) => n,
                // Idle socket timeout or signal: nothing this round.
                Err(e) if is_idle(&e) => 0,
                Err(e) => {
                    let err = TransferError::ReadError(e);
                    warn!(peer = %peer, code = err.code(), error = %err, "Receive failed");
                    return Err(err);
                }
            };

            if round > 0 {
                sink.write_all(&chunk[..round]).map_err(|e| {
                    let err = TransferError::Sink(e);
                    warn!(code = err.code(), error = %err, "Receive failed");
                    err
                })?;
                total += round;
                trace!(peer = %peer, bytes = round, total, "Read chunk");
            }
        }

        let elapsed = started.elapsed();
        if round == 0 && (total > 0 || elapsed >= tunables.read_timeout) {
            break;
        }
        if !readable && round == 0 {
            debug!(peer = %peer, "Socket not readable within idle wait");
            break;
        }
        if round == 0 {
            // Readable with nothing to read means EOF, which stays readable.
            // Pace the remaining wait instead of polling it back to back.
            thread::sleep(tunables.select_wait.min(tunables.read_timeout - elapsed));
        }
    }

    Ok(Drained { total, rounds })
}

fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
