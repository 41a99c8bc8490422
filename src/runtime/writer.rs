//! Send phase: put one normalized message on the wire.

use crate::config::Tunables;
use crate::message::Message;
use crate::runtime::{Connection, TransferError};
use std::io::Write;
use tracing::{debug, info, warn};

/// Write `message` to `conn` in a single operation.
///
/// Up to `send_retry` readiness checks are made; the first one that reports
/// the socket writable performs the write and ends the loop either way.
/// Returns `Ok(0)` when the socket never became writable.
pub fn send_message(
    conn: &mut Connection,
    message: &Message,
    tunables: &Tunables,
) -> Result<usize, TransferError> {
    let payload = message.as_bytes();
    let peer = conn.peer();

    for attempt in 1..=tunables.send_retry {
        if !conn.is_connected() {
            let err = TransferError::ConnLost;
            warn!(peer = %peer, code = err.code(), "Send failed: connection lost");
            return Err(err);
        }

        if !conn.can_write(tunables.select_wait) {
            debug!(peer = %peer, attempt, "Socket not writable yet");
            continue;
        }

        let written = match conn.write(payload).and_then(|n| conn.flush().map(|()| n)) {
            Ok(n) => n,
            Err(e) => {
                let err = TransferError::WriteError(e);
                warn!(peer = %peer, code = err.code(), error = %err, "Send failed");
                return Err(err);
            }
        };

        if written < message.len() {
            let err = TransferError::PartialWrite {
                written,
                expected: message.len(),
            };
            warn!(peer = %peer, code = err.code(), error = %err, "Send failed");
            return Err(err);
        }

        info!(bytes = written, peer = %peer, "Sent message");
        return Ok(written);
    }

    warn!(
        peer = %peer,
        attempts = tunables.send_retry,
        "Socket never became writable, nothing sent"
    );
    Ok(0)
}
