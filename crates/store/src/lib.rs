//! # Store Crate
//!
//! Persistence for the recommendation system:
//!
//! - **feedback**: the append-only CSV log of user reactions to
//!   recommendations, consumed by the model updater
//! - **snapshot**: atomic save/load of the trained model bundle
//! - **error**: error types for both stores

pub mod error;
pub mod feedback;
pub mod snapshot;

pub use error::{Result, StoreError};
pub use feedback::{FeedbackLog, FeedbackRecord, LoadedFeedback};
pub use snapshot::{ModelSnapshot, SnapshotStore};
