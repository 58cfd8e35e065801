//! Error types for the persistence crate.

use thiserror::Error;

/// Errors from the feedback log and the snapshot store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot file does not exist yet
    #[error("No snapshot found at {path}")]
    SnapshotNotFound { path: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, StoreError>;
