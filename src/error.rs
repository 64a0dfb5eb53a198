//! Centralized error types for mboxdedup.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxdedup library.
///
/// Only fatal conditions travel through this type. Best-effort outcomes
/// (an unreadable scan candidate, a body that cannot be decoded) are
/// ordinary values, see [`crate::scanner::Classification`] and
/// [`crate::parser::mime::BodyText`].
#[derive(Error, Debug)]
pub enum DedupError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("MBOX file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file does not appear to be a valid MBOX.
    #[error("File does not appear to be a valid MBOX: {0}")]
    InvalidMbox(PathBuf),

    /// Creating the pre-run backup archive failed.
    #[error("Backup failed: {0}")]
    Backup(String),

    /// An invalid path was provided.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, DedupError>`.
pub type Result<T> = std::result::Result<T, DedupError>;

impl DedupError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `DedupError::io`).
impl From<std::io::Error> for DedupError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

impl From<zip::result::ZipError> for DedupError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Backup(e.to_string())
    }
}
