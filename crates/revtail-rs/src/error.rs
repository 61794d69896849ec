use std::error::Error;
use std::fmt::{self, Display};

/// Typed errors produced while tailing a file.
///
/// Validation of the request happens before a reader is built, so everything
/// here is either an I/O failure or a mid-read consistency/encoding failure.
/// None of these are retried; the in-flight read is aborted.
#[derive(Debug)]
pub enum TailError {
    /// Underlying read/stat/open failure.
    Io(std::io::Error),
    /// The file's modification time advanced after the session was opened.
    FileChanged(String),
    /// Malformed UTF-8 anywhere in the emitted content.
    InvalidUtf8(String),
}

impl Display for TailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TailError::Io(e) => write!(f, "io error: {}", e),
            TailError::FileChanged(s) => write!(f, "file changed during read: {}", s),
            TailError::InvalidUtf8(s) => write!(f, "invalid utf-8: {}", s),
        }
    }
}

impl Error for TailError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TailError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TailError {
    fn from(e: std::io::Error) -> Self {
        TailError::Io(e)
    }
}
