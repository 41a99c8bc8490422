//! Where a session sends its messages.

use std::fmt;
use thiserror::Error;

/// Address a bind-only session listens on when no destination is given.
pub const ANY_ADDRESS: &str = "0.0.0.0";

/// A peer to dial, or a local address to accept one peer on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Connect out to `host:port`.
    Dial { host: String, port: u16 },
    /// Bind `host:port` and wait for a single incoming connection.
    Listen { host: String, port: u16 },
}

/// Why a destination argument could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DestinationError {
    #[error("destination '{0}' is not of the form host:port")]
    MissingPort(String),
    #[error("destination '{0}' has an empty host")]
    EmptyHost(String),
    #[error("destination '{0}' has an invalid port")]
    InvalidPort(String),
}

impl Destination {
    /// Parse a `host:port` argument into a dial destination.
    pub fn parse(arg: &str) -> Result<Self, DestinationError> {
        let (host, port) = split_host_port(arg)?;
        Ok(Destination::Dial { host, port })
    }

    /// Bind destination for listen mode; the argument's port is ignored.
    pub fn listen_on(arg: Option<&str>, port: u16) -> Result<Self, DestinationError> {
        let host = match arg {
            Some(arg) => match split_host_port(arg) {
                Ok((host, _)) => host,
                Err(DestinationError::MissingPort(_)) if !arg.is_empty() => arg.to_string(),
                Err(e) => return Err(e),
            },
            None => ANY_ADDRESS.to_string(),
        };
        Ok(Destination::Listen { host, port })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Dial { host, port } => write!(f, "{host}:{port}"),
            Destination::Listen { host, port } => write!(f, "listen {host}:{port}"),
        }
    }
}

fn split_host_port(arg: &str) -> Result<(String, u16), DestinationError> {
    let (host, port) = arg
        .rsplit_once(':')
        .ok_or_else(|| DestinationError::MissingPort(arg.to_string()))?;
    if host.is_empty() {
        return Err(DestinationError::EmptyHost(arg.to_string()));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| DestinationError::InvalidPort(arg.to_string()))?;
    Ok((host.to_string(), port))
}
