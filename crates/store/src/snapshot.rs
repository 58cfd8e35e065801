//! Versioned persistence of the trained model.
//!
//! A snapshot bundles everything a recommendation call needs: the
//! factorization parameters, the rating matrix it was trained on, and
//! the latent factors. Saving is atomic so a concurrent reader never
//! observes a partially-written file.

use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use engine::{LatentFactors, NmfConfig, RatingMatrix};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The complete trained model at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Factorization parameters the model was trained with
    pub config: NmfConfig,
    /// The combined rating matrix (original + synthetic feedback ratings)
    pub matrix: RatingMatrix,
    /// The fitted decomposition
    pub factors: LatentFactors,
    /// When this snapshot was created; also its version key
    pub created_at: DateTime<Utc>,
    /// Feedback records folded into this model
    pub feedback_applied: usize,
    /// Feedback records dropped because their title had no catalog match
    pub feedback_dropped: usize,
}

/// File-backed store for the single current snapshot.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a snapshot atomically: serialize to a temporary sibling
    /// file, then rename over the target. Readers see either the old
    /// file or the new one in full.
    pub fn save(&self, snapshot: &ModelSnapshot) -> Result<()> {
        let json = serde_json::to_vec(snapshot)?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, &json)?;
        fs::rename(&tmp_path, &self.path)?;

        info!(
            "Saved model snapshot ({} users x {} movies) to {}",
            snapshot.matrix.n_users(),
            snapshot.matrix.n_items(),
            self.path.display()
        );
        Ok(())
    }

    /// Load the current snapshot, failing with `SnapshotNotFound` when
    /// none has been saved yet.
    pub fn load(&self) -> Result<ModelSnapshot> {
        if !self.path.exists() {
            return Err(StoreError::SnapshotNotFound {
                path: self.path.display().to_string(),
            });
        }
        let json = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&json)?)
    }
}
