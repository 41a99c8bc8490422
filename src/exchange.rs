//! Message exchange over one established connection.
//!
//! Messages go out strictly in input order, each followed by a full read
//! of its response. Nothing is pipelined, and the first failure ends the
//! exchange without skipping ahead.

use crate::config::Tunables;
use crate::message;
use crate::runtime::{receive_response, send_message, Connection, TransferError};
use std::io::Write;
use tracing::{debug, warn};

/// Send every message in `input` over `conn`, appending replies to `sink`.
///
/// Returns the total number of response bytes received.
pub fn run(
    conn: &mut Connection,
    input: &[u8],
    sink: &mut dyn Write,
    tunables: &Tunables,
) -> Result<usize, TransferError> {
    if input.is_empty() {
        let err = TransferError::NoInput;
        warn!(code = err.code(), "Input is empty, nothing to send");
        return Err(err);
    }

    let messages = message::messages(input, &tunables.delimiter);
    debug!(count = messages.len(), peer = %conn.peer(), "Starting exchange");

    let mut received = 0usize;
    for (index, msg) in messages.iter().enumerate() {
        let mut pass = 0u32;
        loop {
            pass += 1;
            let written = send_message(conn, msg, tunables)?;
            let read = match receive_response(conn, sink, tunables) {
                Ok(n) => n,
                Err(e) => {
                    warn!(message = index, code = e.code(), error = %e, "Aborting exchange");
                    return Err(e);
                }
            };

            // Nothing moved either way: try the same message again.
            if written == 0 && read == 0 && pass < tunables.send_retry {
                debug!(message = index, pass, "No traffic, repeating message");
                continue;
            }

            received += read;
            break;
        }
    }

    Ok(received)
}
