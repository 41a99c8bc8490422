//! Input source and output sink.
//!
//! The input is read completely before anything is sent. The output is a
//! buffered writer over a file or stdout, released when it goes out of scope.

use crate::error::FatalError;
use bytes::{BufMut, Bytes, BytesMut};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read the whole input source: `path`, or stdin when `None`.
pub fn read_input(path: Option<&Path>) -> Result<Bytes, FatalError> {
    let input_error = |source| FatalError::Input {
        path: path.map(Path::to_path_buf),
        source,
    };

    let mut buf = BytesMut::new().writer();
    match path {
        Some(path) => {
            let mut file = File::open(path).map_err(input_error)?;
            io::copy(&mut file, &mut buf).map_err(input_error)?;
        }
        None => {
            io::copy(&mut io::stdin().lock(), &mut buf).map_err(input_error)?;
        }
    }

    let blob = buf.into_inner().freeze();
    debug!(bytes = blob.len(), "Read input");
    Ok(blob)
}

/// Where received responses are written.
pub struct Output {
    inner: BufWriter<Box<dyn Write>>,
    path: Option<PathBuf>,
}

impl Output {
    /// Create (truncating) `path`, or use stdout when `None`.
    pub fn open(path: Option<&Path>) -> Result<Self, FatalError> {
        let sink: Box<dyn Write> = match path {
            Some(p) => Box::new(File::create(p).map_err(|source| FatalError::Output {
                path: Some(p.to_path_buf()),
                source,
            })?),
            None => Box::new(io::stdout()),
        };

        Ok(Self {
            inner: BufWriter::new(sink),
            path: path.map(Path::to_path_buf),
        })
    }

    /// Flush everything written so far and release the handle.
    pub fn finish(mut self) -> Result<(), FatalError> {
        self.inner.flush().map_err(|source| FatalError::Output {
            path: self.path.take(),
            source,
        })
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
