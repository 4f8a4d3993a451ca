//! Centralized error type for the retempo umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use retempo_core::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] retempo_core::Error),

    #[error(transparent)]
    Export(#[from] retempo_export::ExportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A background job ended without producing a result.
    #[error("Background job failed: {0}")]
    Job(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Core(e) => e.kind(),
            Error::Export(e) => e.kind(),
            Error::Io(_) | Error::Job(_) => ErrorKind::IoFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
