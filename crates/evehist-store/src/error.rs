//! Error types for evehist-store.

use std::path::PathBuf;

/// Result type for evehist-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in evehist-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to create the snapshot directory.
    #[error("Failed to create snapshot directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a snapshot file.
    #[error("Failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a snapshot file.
    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Snapshot content was not valid JSON for the expected layout.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
