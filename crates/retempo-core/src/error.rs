//! Error types for retempo-core.

use std::path::PathBuf;
use thiserror::Error;

/// Broad failure category shared by every retempo error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad tempo, pitch, rate or format, rejected before processing starts.
    InvalidParameter,
    /// Operation invoked out of sequence (e.g. feeding input after flush).
    InvalidState,
    /// A source or sink could not be opened, read, written or seeked.
    IoFailure,
    /// Input ended mid-operation, leaving output unfinalized.
    TruncatedInput,
}

/// Error type for retempo-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O failure on {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Truncated input: {0}")]
    TruncatedInput(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::Io(_) | Error::File { .. } => ErrorKind::IoFailure,
            Error::TruncatedInput(_) => ErrorKind::TruncatedInput,
        }
    }

    /// Attach a path to an I/O error.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            Error::InvalidParameter("tempo".into()).kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(
            Error::InvalidState("flushed".into()).kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            Error::from(std::io::Error::other("disk")).kind(),
            ErrorKind::IoFailure
        );
        assert_eq!(
            Error::file("/nope", std::io::Error::other("missing")).kind(),
            ErrorKind::IoFailure
        );
        assert_eq!(
            Error::TruncatedInput("header".into()).kind(),
            ErrorKind::TruncatedInput
        );
    }

    #[test]
    fn test_file_error_mentions_path() {
        let err = Error::file(
            "/tmp/in.wav",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/in.wav"), "{msg}");
        assert!(msg.contains("not found"), "{msg}");
    }
}
