//! Error types for the record store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors emitted by `RecordStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The data directory or a dataset file cannot be created, opened or written.
    #[error("storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An existing dataset file cannot be parsed as CSV.
    #[error("malformed dataset {}: {source}", .path.display())]
    MalformedExistingData {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// A row could not be encoded as CSV.
    #[error("failed to encode row: {0}")]
    Encode(#[from] csv::Error),
}

impl StoreError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::StorageUnavailable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        StoreError::MalformedExistingData {
            path: path.into(),
            source,
        }
    }
}
