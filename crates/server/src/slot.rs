//! Publication of model snapshots to concurrent readers, plus the
//! memoization layer for built rating matrices.
//!
//! The snapshot slot is the one piece of shared mutable state in the
//! whole system. The updater computes a full new snapshot off to the
//! side and swaps it in here; readers always see an entirely-old or
//! entirely-new snapshot, never a mix.

use engine::RatingMatrix;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use store::ModelSnapshot;
use tracing::{debug, info};

/// Single-writer / multiple-reader slot holding the current snapshot.
#[derive(Default)]
pub struct SnapshotSlot {
    current: RwLock<Option<Arc<ModelSnapshot>>>,
    generation: AtomicU64,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new snapshot. Only the model updater calls this.
    pub fn publish(&self, snapshot: ModelSnapshot) -> Arc<ModelSnapshot> {
        let snapshot = Arc::new(snapshot);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        // Lock poisoning only happens if a writer panicked mid-swap;
        // the swap itself cannot panic, so unwrapping the guard is safe
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        info!(generation, "Published new model snapshot");
        snapshot
    }

    /// The current snapshot, if any update has been published.
    pub fn current(&self) -> Option<Arc<ModelSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Monotonic counter bumped by every publish; used as a cache key.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Memoizes built rating matrices keyed by (snapshot generation,
/// popularity threshold). Entries from older generations are purged on
/// access, so publishing a snapshot invalidates the cache precisely.
#[derive(Default)]
pub struct MatrixCache {
    entries: RwLock<HashMap<(u64, u32), Arc<RatingMatrix>>>,
}

impl MatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the matrix for (generation, min_ratings), building it on miss.
    pub fn get_or_build<F>(
        &self,
        generation: u64,
        min_ratings: u32,
        build: F,
    ) -> engine::Result<Arc<RatingMatrix>>
    where
        F: FnOnce() -> engine::Result<RatingMatrix>,
    {
        let key = (generation, min_ratings);
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(matrix) = entries.get(&key) {
                debug!(generation, min_ratings, "Rating matrix cache hit");
                return Ok(matrix.clone());
            }
        }

        let matrix = Arc::new(build()?);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|&(g, _), _| g == generation);
        entries.insert(key, matrix.clone());
        debug!(generation, min_ratings, "Rating matrix cache fill");
        Ok(matrix)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
