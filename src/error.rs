//! Errors that end the process.
//!
//! These are returned up to `main`, which reports them once and exits with
//! status 1 after every open stream has been released.

use crate::config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FatalError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("cannot read input {}: {source}", display_path(.path.as_ref(), "<stdin>"))]
    Input {
        path: Option<PathBuf>,
        source: io::Error,
    },
    #[error("cannot write output {}: {source}", display_path(.path.as_ref(), "<stdout>"))]
    Output {
        path: Option<PathBuf>,
        source: io::Error,
    },
    #[error("cannot listen on {addr}: {source}")]
    Bind { addr: String, source: io::Error },
}

fn display_path(path: Option<&PathBuf>, fallback: &str) -> String {
    path.map_or_else(|| fallback.to_string(), |p| p.display().to_string())
}
