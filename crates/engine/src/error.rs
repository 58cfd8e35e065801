//! Error types for the recommendation engine.

use thiserror::Error;

/// Errors raised while building matrices or ranking neighbors
#[derive(Error, Debug)]
pub enum EngineError {
    /// A queried movie title is not a column of the matrix or the
    /// latent-factor index. Recoverable at the caller boundary.
    #[error("Movie '{title}' not found in the dataset")]
    ItemNotFound { title: String },

    /// No movie survived the popularity threshold; the rating matrix
    /// would have an empty column set.
    #[error("No movie has at least {min_ratings} ratings")]
    DataInsufficient { min_ratings: u32 },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, EngineError>;
