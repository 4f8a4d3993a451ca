//! Error types for retempo-export

use retempo_core::ErrorKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Export error type
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error while reading, writing or seeking
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A source or destination could not be opened
    #[error("Cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid format parameters
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Input container or encoding that cannot be handled
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Output left unfinalized
    #[error("Truncated output: {0}")]
    Truncated(String),

    /// Resampling error
    #[error("Resampling error: {0}")]
    Resample(String),

    #[error(transparent)]
    Core(#[from] retempo_core::Error),
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::Io(_) | ExportError::Open { .. } => ErrorKind::IoFailure,
            ExportError::InvalidOptions(_)
            | ExportError::UnsupportedFormat(_)
            | ExportError::Resample(_) => ErrorKind::InvalidParameter,
            ExportError::Truncated(_) => ErrorKind::TruncatedInput,
            ExportError::Core(e) => e.kind(),
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExportError::Open {
            path: path.into(),
            source,
        }
    }
}

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

// From trait implementations for external library errors at API boundary

#[cfg(feature = "wav")]
impl From<hound::Error> for ExportError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => ExportError::Io(io),
            other => ExportError::UnsupportedFormat(other.to_string()),
        }
    }
}

impl From<rubato::ResamplerConstructionError> for ExportError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        ExportError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for ExportError {
    fn from(e: rubato::ResampleError) -> Self {
        ExportError::Resample(e.to_string())
    }
}
