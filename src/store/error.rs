//! Error types for the layered variable store.

use std::fmt;
use std::io;

/// Errors that can occur while persisting a variable.
///
/// Session-tier operations are infallible; only the persistent tier, which
/// delegates to a durable-write collaborator, can fail. A failed write is
/// surfaced to the caller rather than silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The durable-write collaborator rejected the write.
    WriteRejected(String),

    /// IO error occurred while reading or writing the backing file.
    IoError(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::WriteRejected(msg) => {
                write!(f, "Persistent write rejected: {}", msg)
            }
            StoreError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::IoError(err.to_string())
    }
}
