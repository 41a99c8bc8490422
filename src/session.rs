//! Session driver: walk the destination list until one of them answers.
//!
//! Per destination the state machine is
//! `ATTEMPT -> (SUCCESS | RETRY -> ATTEMPT | EXHAUSTED)`: up to `conn_retry`
//! attempts, `conn_retry_delay` apart, each one a fresh connection that is
//! closed when the attempt ends. The first destination that delivers any
//! response bytes ends the session.

use crate::config::Tunables;
use crate::destination::Destination;
use crate::error::FatalError;
use crate::exchange;
use crate::runtime::{connector, TransferError};
use std::io::Write;
use std::thread;
use tracing::{debug, info, warn};

/// Which destination answered, and how much it sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub destination: Destination,
    pub bytes: usize,
}

/// Result of working through one destination.
enum Outcome {
    Delivered(usize),
    Exhausted,
    /// Retrying elsewhere cannot help (empty input, broken sink).
    Abandoned(TransferError),
}

/// Run the whole session. Returns `None` when no destination delivered.
pub fn run(
    destinations: &[Destination],
    input: &[u8],
    sink: &mut dyn Write,
    tunables: &Tunables,
) -> Result<Option<SessionReport>, FatalError> {
    for dest in destinations {
        match drive_destination(dest, input, sink, tunables)? {
            Outcome::Delivered(bytes) => {
                info!(destination = %dest, bytes, "Session complete");
                return Ok(Some(SessionReport {
                    destination: dest.clone(),
                    bytes,
                }));
            }
            Outcome::Exhausted => {
                warn!(destination = %dest, "Giving up on destination");
            }
            Outcome::Abandoned(err) => {
                warn!(code = err.code(), error = %err, "Session abandoned");
                return Ok(None);
            }
        }
    }

    warn!(count = destinations.len(), "No destination produced a response");
    Ok(None)
}

fn drive_destination(
    dest: &Destination,
    input: &[u8],
    sink: &mut dyn Write,
    tunables: &Tunables,
) -> Result<Outcome, FatalError> {
    let mut last = Err(TransferError::Unreachable);

    for attempt in 1..=tunables.conn_retry {
        if attempt > 1 {
            debug!(
                destination = %dest,
                delay_ms = tunables.conn_retry_delay.as_millis() as u64,
                "Waiting before retry"
            );
            thread::sleep(tunables.conn_retry_delay);
        }
        info!(destination = %dest, attempt, of = tunables.conn_retry, "Connecting");

        last = match connector::open(dest, tunables)? {
            Some(mut conn) => {
                let result = exchange::run(&mut conn, input, sink, tunables);
                conn.close();
                result
            }
            None => Err(TransferError::Unreachable),
        };

        match &last {
            Ok(_) => break,
            Err(e) if !e.is_retryable() => break,
            Err(e) => {
                warn!(destination = %dest, attempt, code = e.code(), error = %e, "Attempt failed");
            }
        }
    }

    Ok(match last {
        Ok(bytes) if bytes > 0 => Outcome::Delivered(bytes),
        Ok(_) => Outcome::Exhausted,
        Err(e) if !e.is_retryable() => Outcome::Abandoned(e),
        Err(_) => Outcome::Exhausted,
    })
}
