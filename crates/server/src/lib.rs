//! # Server Crate
//!
//! Coordinates the recommendation engine for boundary callers:
//!
//! 1. Builds (and memoizes) the rating matrix from the loaded dataset
//! 2. Serves both ranking strategies against the current model
//! 3. Runs the model updater and publishes new snapshots atomically
//!
//! The facade holds no mutable state besides the snapshot slot;
//! recommendation calls are pure reads and may run concurrently.

pub mod slot;
pub mod updater;

pub use slot::{MatrixCache, SnapshotSlot};
pub use updater::{ModelUpdater, SYNTHETIC_USER, UPDATE_MIN_RATINGS, UpdateConfig};

use anyhow::{Context, Result};
use data_loader::Dataset;
use engine::{NmfConfig, RatingMatrix, Scored, build_matrix, correlation, factorization};
use std::sync::Arc;
use store::ModelSnapshot;
use tracing::{debug, info};

/// Popularity threshold for the live matrix
pub const DEFAULT_MIN_RATINGS: u32 = 100;

/// Minimum co-rating users for a correlation pair to be defined
pub const DEFAULT_MIN_PERIODS: usize = 100;

/// Default length of a recommendation list
pub const DEFAULT_TOP_N: usize = 10;

/// Facade wiring the dataset, the matrix cache, and the snapshot slot.
pub struct Recommender {
    dataset: Arc<Dataset>,
    slot: SnapshotSlot,
    cache: MatrixCache,
    min_ratings: u32,
    min_periods: usize,
}

impl Recommender {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
            slot: SnapshotSlot::new(),
            cache: MatrixCache::new(),
            min_ratings: DEFAULT_MIN_RATINGS,
            min_periods: DEFAULT_MIN_PERIODS,
        }
    }

    /// Configure the live popularity threshold (default: 100)
    pub fn with_min_ratings(mut self, min_ratings: u32) -> Self {
        self.min_ratings = min_ratings;
        self
    }

    /// Configure the correlation co-rater floor (default: 100)
    pub fn with_min_periods(mut self, min_periods: usize) -> Self {
        self.min_periods = min_periods;
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// The currently published snapshot, if an update has run.
    pub fn snapshot(&self) -> Option<Arc<ModelSnapshot>> {
        self.slot.current()
    }

    /// The live rating matrix, memoized per (snapshot generation,
    /// threshold) and rebuilt only after a new snapshot is published.
    pub fn matrix(&self) -> Result<Arc<RatingMatrix>> {
        let generation = self.slot.generation();
        self.cache
            .get_or_build(generation, self.min_ratings, || {
                build_matrix(&self.dataset.ratings, &self.dataset.movies, self.min_ratings)
            })
            .context("Failed to build rating matrix")
    }

    /// Correlation strategy: rank neighbors by item-item Pearson
    /// correlation over co-rating users.
    pub fn similarity_recommendations(&self, title: &str, top_n: usize) -> Result<Vec<Scored>> {
        let matrix = self.matrix()?;
        let similarity = correlation::compute_similarity(&matrix, self.min_periods);
        let recs = correlation::recommend(title, &similarity, top_n)?;
        debug!("{} correlation neighbors for '{}'", recs.len(), title);
        Ok(recs)
    }

    /// Factorization strategy: rank neighbors by cosine similarity of
    /// item latent vectors. Prefers the published snapshot's factors;
    /// without one, fits a fresh model on the live matrix.
    pub fn latent_recommendations(&self, title: &str, top_n: usize) -> Result<Vec<Scored>> {
        if let Some(snapshot) = self.slot.current() {
            let recs = factorization::recommend(title, &snapshot.factors, top_n)?;
            debug!("{} latent neighbors for '{}' (snapshot)", recs.len(), title);
            return Ok(recs);
        }

        let matrix = self.matrix()?;
        let factors = factorization::factorize(&matrix, &NmfConfig::default());
        let recs = factorization::recommend(title, &factors, top_n)?;
        debug!("{} latent neighbors for '{}' (fresh fit)", recs.len(), title);
        Ok(recs)
    }

    /// Run one update cycle and publish the resulting snapshot. The
    /// publish bumps the generation, which invalidates the matrix cache.
    pub fn update_model(&self, updater: &mut ModelUpdater) -> Result<Arc<ModelSnapshot>> {
        let snapshot = updater.update().context("Model update failed")?;
        let published = self.slot.publish(snapshot);
        info!(
            feedback_applied = published.feedback_applied,
            feedback_dropped = published.feedback_dropped,
            "Model snapshot published"
        );
        Ok(published)
    }
}
