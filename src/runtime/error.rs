//! Failure classes produced by the I/O phases.
//!
//! Each variant carries a stable negative code so log lines can be matched
//! against the numeric taxonomy used by operators.

use std::io;
use thiserror::Error;

/// Outcome of one write, read or exchange that did not succeed.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Socket no longer reports a peer at the start of a round.
    #[error("connection lost")]
    ConnLost,
    /// The write call itself failed.
    #[error("write failed: {0}")]
    WriteError(#[source] io::Error),
    /// The socket accepted only part of the message.
    #[error("partial write: {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },
    /// The read call itself failed.
    #[error("read failed: {0}")]
    ReadError(#[source] io::Error),
    /// Nothing was received before the read gave up.
    #[error("read timed out with no data")]
    ReadTimeout,
    /// The input source was empty.
    #[error("no input to send")]
    NoInput,
    /// The connection manager produced no connection.
    #[error("destination unreachable")]
    Unreachable,
    /// Received bytes could not be written to the output sink.
    #[error("output sink write failed: {0}")]
    Sink(#[source] io::Error),
}

impl TransferError {
    /// Numeric code of this failure class (always negative).
    pub fn code(&self) -> i32 {
        match self {
            TransferError::ConnLost => -1,
            TransferError::WriteError(_) => -2,
            TransferError::PartialWrite { .. } => -3,
            TransferError::ReadError(_) => -4,
            TransferError::ReadTimeout => -5,
            TransferError::NoInput => -6,
            TransferError::Unreachable => -7,
            TransferError::Sink(_) => -8,
        }
    }

    /// Whether re-dialing the destination could change the outcome.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransferError::NoInput | TransferError::Sink(_))
    }
}
