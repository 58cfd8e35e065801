//! The model updater: folds user feedback back into the rating corpus
//! and retrains the factorization model.
//!
//! ## Algorithm
//! 1. Load the feedback log (a missing log is informational, not an error)
//! 2. Map each record's recommended title to a movie id via the catalog;
//!    unmapped records are dropped, counted, and reported
//! 3. Turn surviving records into ratings from a fixed synthetic user
//!    and append them to the working corpus
//! 4. Rebuild the matrix with a lower popularity threshold than the
//!    live default, so freshly-boosted movies are not filtered away
//! 5. Re-run the seeded factorization and persist a new snapshot
//!
//! The updater never consumes or deduplicates the feedback log: running
//! it again with the same log appends the same synthetic ratings to the
//! corpus again, and the synthetic user's preference vector accumulates
//! across updates.

use anyhow::{Context, Result};
use chrono::Utc;
use data_loader::{Dataset, MovieCatalog, Rating, UserId};
use engine::{NmfConfig, build_matrix, factorization};
use store::{FeedbackLog, FeedbackRecord, ModelSnapshot, SnapshotStore};
use tracing::{info, warn};

/// Threshold used when retraining with feedback. Lower than the live
/// default of 100: feedback volume is small, and the higher threshold
/// would discard the movies feedback just boosted.
pub const UPDATE_MIN_RATINGS: u32 = 50;

/// Fixed virtual identity that owns every feedback-derived rating
pub const SYNTHETIC_USER: UserId = 999_999;

/// Parameters for a model update.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub min_ratings: u32,
    pub nmf: NmfConfig,
    pub synthetic_user: UserId,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            min_ratings: UPDATE_MIN_RATINGS,
            nmf: NmfConfig::default(),
            synthetic_user: SYNTHETIC_USER,
        }
    }
}

/// Owns the snapshot lifecycle: the working rating corpus, the feedback
/// log it reads, and the store it persists snapshots to.
pub struct ModelUpdater {
    config: UpdateConfig,
    catalog: MovieCatalog,
    /// Original ratings plus every synthetic rating appended so far
    ratings: Vec<Rating>,
    feedback: FeedbackLog,
    store: SnapshotStore,
}

impl ModelUpdater {
    pub fn new(dataset: &Dataset, feedback: FeedbackLog, store: SnapshotStore) -> Self {
        Self {
            config: UpdateConfig::default(),
            catalog: dataset.movies.clone(),
            ratings: dataset.ratings.clone(),
            feedback,
            store,
        }
    }

    /// Override the update parameters (builder pattern).
    pub fn with_config(mut self, config: UpdateConfig) -> Self {
        self.config = config;
        self
    }

    /// The working corpus, including accumulated synthetic ratings.
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// Run one update cycle and persist the resulting snapshot.
    pub fn update(&mut self) -> Result<ModelSnapshot> {
        let (applied, dropped) = match self
            .feedback
            .load()
            .context("Failed to read feedback log")?
        {
            Some(loaded) => {
                if loaded.skipped > 0 {
                    warn!("{} malformed feedback rows skipped", loaded.skipped);
                }
                self.append_synthetic_ratings(&loaded.records)
            }
            None => {
                info!("No feedback found; using original data only");
                (0, 0)
            }
        };

        let matrix = build_matrix(&self.ratings, &self.catalog, self.config.min_ratings)
            .context("Failed to rebuild rating matrix from combined data")?;
        let factors = factorization::factorize(&matrix, &self.config.nmf);

        let snapshot = ModelSnapshot {
            config: self.config.nmf.clone(),
            matrix,
            factors,
            created_at: Utc::now(),
            feedback_applied: applied,
            feedback_dropped: dropped,
        };
        self.store
            .save(&snapshot)
            .context("Failed to persist model snapshot")?;

        info!(
            feedback_applied = applied,
            feedback_dropped = dropped,
            converged = snapshot.factors.converged,
            "Model update complete"
        );
        Ok(snapshot)
    }

    /// Convert feedback records into synthetic ratings and append them
    /// to the corpus. Returns (applied, dropped) counts; a record whose
    /// recommended title has no catalog match is dropped.
    fn append_synthetic_ratings(&mut self, records: &[FeedbackRecord]) -> (usize, usize) {
        let now = Utc::now().timestamp();
        let mut applied = 0;
        let mut dropped = 0;

        for record in records {
            match self.catalog.id_of(&record.recommended_movie) {
                Some(movie_id) => {
                    self.ratings.push(Rating {
                        user_id: self.config.synthetic_user,
                        movie_id,
                        rating: record.user_rating,
                        timestamp: now,
                    });
                    applied += 1;
                }
                None => {
                    dropped += 1;
                    warn!(
                        "Dropping feedback for unknown title '{}'",
                        record.recommended_movie
                    );
                }
            }
        }

        (applied, dropped)
    }
}
