//! Latent-factor similarity: non-negative matrix factorization of the
//! zero-filled rating matrix, then cosine similarity between item
//! latent vectors.
//!
//! ## Algorithm
//! 1. Replace every absent cell with 0.0. This treats "never rated" the
//!    same as the bottom of the rating scale inside the decomposition;
//!    that is the established behavior of this engine and is kept as-is.
//! 2. Factorize V (users x items) into W (users x k) and H (k x items)
//!    with Lee-Seung multiplicative updates, seeded random init.
//! 3. Rank neighbors by cosine similarity of the columns of H.

use crate::error::{EngineError, Result};
use crate::matrix::RatingMatrix;
use crate::types::{Scored, rank_descending};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Guard against division by zero in the multiplicative updates
const UPDATE_EPS: f64 = 1e-10;

/// How often the reconstruction error is re-evaluated, in iterations
const CONVERGENCE_CHECK_EVERY: usize = 10;

/// Factorization parameters. Serializable because they are persisted
/// inside every model snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmfConfig {
    /// Rank of the decomposition (latent dimensions)
    pub components: usize,
    /// Iteration budget; exhausting it is tolerated, not an error
    pub max_iter: usize,
    /// Relative improvement below which the fit is considered converged
    pub tolerance: f64,
    /// Seed for factor initialization; fixed seed makes runs reproducible
    pub seed: u64,
}

impl Default for NmfConfig {
    fn default() -> Self {
        Self {
            components: 20,
            max_iter: 200,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// The learned decomposition: user factors (users x k) and item
/// factors (k x items), both non-negative, plus fit diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatentFactors {
    titles: Vec<String>,
    title_index: HashMap<String, usize>,
    user_factors: Array2<f64>,
    item_factors: Array2<f64>,
    pub iterations: usize,
    pub reconstruction_error: f64,
    /// False when the iteration budget ran out before the tolerance was
    /// met. The factors are still used; callers wanting to observe the
    /// condition read this flag.
    pub converged: bool,
}

impl LatentFactors {
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn has_title(&self, title: &str) -> bool {
        self.title_index.contains_key(title)
    }

    pub fn components(&self) -> usize {
        self.item_factors.nrows()
    }

    pub fn user_factors(&self) -> &Array2<f64> {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &Array2<f64> {
        &self.item_factors
    }

    /// Latent vector for a movie: one column of the item factor matrix.
    pub fn vector_for(&self, title: &str) -> Option<ArrayView1<'_, f64>> {
        let col = *self.title_index.get(title)?;
        Some(self.item_factors.column(col))
    }
}

/// Factorize the zero-filled rating matrix.
///
/// Never fails: a fit that exhausts `max_iter` without meeting the
/// tolerance is returned with `converged = false` and a warning,
/// because a partially-converged model is still usable for ranking.
pub fn factorize(matrix: &RatingMatrix, config: &NmfConfig) -> LatentFactors {
    let n_users = matrix.n_users();
    let n_items = matrix.n_items();
    let k = config.components.min(n_users).min(n_items).max(1);
    if k < config.components {
        debug!(
            "Clamped components from {} to {} for a {}x{} matrix",
            config.components, k, n_users, n_items
        );
    }

    // Zero-fill: absent cells become 0.0 for the decomposition only
    let v = Array2::from_shape_fn((n_users, n_items), |(row, col)| {
        matrix.value_at(row, col).unwrap_or(0.0) as f64
    });

    // Seeded uniform init, scaled to the magnitude of the data
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mean = v.mean().unwrap_or(0.0);
    let scale = if mean > 0.0 { (mean / k as f64).sqrt() } else { 1.0 };
    let mut w = Array2::from_shape_fn((n_users, k), |_| scale * rng.random::<f64>());
    let mut h = Array2::from_shape_fn((k, n_items), |_| scale * rng.random::<f64>());

    let initial_error = reconstruction_error(&v, &w, &h).max(f64::EPSILON);
    let mut previous_error = initial_error;
    let mut error = initial_error;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 1..=config.max_iter {
        // H <- H * (W^T V) / (W^T W H)
        let numer_h = w.t().dot(&v);
        let denom_h = w.t().dot(&w).dot(&h) + UPDATE_EPS;
        h *= &(&numer_h / &denom_h);

        // W <- W * (V H^T) / (W H H^T)
        let numer_w = v.dot(&h.t());
        let denom_w = w.dot(&h).dot(&h.t()) + UPDATE_EPS;
        w *= &(&numer_w / &denom_w);

        iterations = iter;

        if iter % CONVERGENCE_CHECK_EVERY == 0 {
            error = reconstruction_error(&v, &w, &h);
            if (previous_error - error) / initial_error < config.tolerance {
                converged = true;
                break;
            }
            previous_error = error;
        }
    }

    if !converged {
        error = reconstruction_error(&v, &w, &h);
        warn!(
            iterations,
            reconstruction_error = error,
            "NMF did not converge within the iteration budget; using partial fit"
        );
    } else {
        debug!(
            iterations,
            reconstruction_error = error,
            "NMF converged"
        );
    }

    LatentFactors {
        titles: matrix.titles().to_vec(),
        title_index: matrix
            .titles()
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect(),
        user_factors: w,
        item_factors: h,
        iterations,
        reconstruction_error: error,
        converged,
    }
}

/// Frobenius norm of V - WH
fn reconstruction_error(v: &Array2<f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
    (v - &w.dot(h)).mapv(|x| x * x).sum().sqrt()
}

fn cosine(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let dot = a.dot(&b);
    let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if norm <= f64::EPSILON { 0.0 } else { dot / norm }
}

/// Rank the neighbors of `title` by cosine similarity of latent vectors.
///
/// Same contract as the correlation strategy: the movie itself is
/// excluded, ties break lexicographically, at most `top_n` results.
pub fn recommend(title: &str, factors: &LatentFactors, top_n: usize) -> Result<Vec<Scored>> {
    let Some(query) = factors.vector_for(title) else {
        return Err(EngineError::ItemNotFound {
            title: title.to_string(),
        });
    };

    let neighbors: Vec<Scored> = factors
        .titles()
        .iter()
        .filter(|other| other.as_str() != title)
        .filter_map(|other| {
            factors
                .vector_for(other)
                .map(|v| Scored::new(other.clone(), cosine(query, v) as f32))
        })
        .collect();

    Ok(rank_descending(neighbors, top_n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::build_matrix;
    use data_loader::{Movie, MovieCatalog, Rating};

    fn fixture_matrix() -> RatingMatrix {
        let mut catalog = MovieCatalog::new();
        for (id, title) in [(1, "A (1990)"), (2, "B (1991)"), (3, "C (1992)")] {
            catalog.insert(Movie {
                id,
                title: title.to_string(),
            });
        }

        // A and B share a rating pattern, C is out of phase with them
        let mut ratings = Vec::new();
        for user in 1u32..=6 {
            let high = user % 2 == 0;
            let value = if high { 5.0 } else { 1.0 };
            for movie_id in [1, 2] {
                ratings.push(Rating {
                    user_id: user,
                    movie_id,
                    rating: value,
                    timestamp: 0,
                });
            }
            ratings.push(Rating {
                user_id: user,
                movie_id: 3,
                rating: if high { 1.0 } else { 5.0 },
                timestamp: 0,
            });
        }

        build_matrix(&ratings, &catalog, 6).unwrap()
    }

    fn small_config() -> NmfConfig {
        NmfConfig {
            components: 2,
            max_iter: 500,
            ..NmfConfig::default()
        }
    }

    #[test]
    fn factors_are_non_negative() {
        let factors = factorize(&fixture_matrix(), &small_config());
        assert!(factors.user_factors().iter().all(|&x| x >= 0.0));
        assert!(factors.item_factors().iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn same_seed_reproduces_the_fit() {
        let matrix = fixture_matrix();
        let a = factorize(&matrix, &small_config());
        let b = factorize(&matrix, &small_config());
        assert_eq!(a.item_factors(), b.item_factors());
        assert_eq!(a.user_factors(), b.user_factors());
    }

    #[test]
    fn low_rank_matrix_reconstructs_within_tolerance() {
        // Rank-1 by construction: user u rates A with u and B with u/2
        let mut catalog = MovieCatalog::new();
        for (id, title) in [(1, "A (1990)"), (2, "B (1991)")] {
            catalog.insert(Movie {
                id,
                title: title.to_string(),
            });
        }
        let mut ratings = Vec::new();
        for user in 1u32..=4 {
            ratings.push(Rating {
                user_id: user,
                movie_id: 1,
                rating: user as f32,
                timestamp: 0,
            });
            ratings.push(Rating {
                user_id: user,
                movie_id: 2,
                rating: user as f32 / 2.0,
                timestamp: 0,
            });
        }
        let matrix = build_matrix(&ratings, &catalog, 4).unwrap();

        let factors = factorize(&matrix, &small_config());
        assert!(
            factors.reconstruction_error < 0.05,
            "reconstruction error {} too large",
            factors.reconstruction_error
        );
    }

    #[test]
    fn exhausted_iteration_budget_is_tolerated() {
        let config = NmfConfig {
            components: 2,
            max_iter: 3,
            tolerance: 0.0, // strict inequality means this never converges
            ..NmfConfig::default()
        };
        let factors = factorize(&fixture_matrix(), &config);

        assert!(!factors.converged);
        assert_eq!(factors.iterations, 3);
        // The partial fit is still a usable model
        assert!(recommend("A (1990)", &factors, 5).is_ok());
    }

    #[test]
    fn recommend_ranks_shared_pattern_first() {
        let factors = factorize(&fixture_matrix(), &small_config());
        let recs = recommend("A (1990)", &factors, 10).unwrap();

        assert!(recs.iter().all(|s| s.title != "A (1990)"));
        assert_eq!(recs[0].title, "B (1991)");
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn recommend_respects_top_n() {
        let factors = factorize(&fixture_matrix(), &small_config());
        let recs = recommend("A (1990)", &factors, 1).unwrap();
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn unknown_title_is_item_not_found() {
        let factors = factorize(&fixture_matrix(), &small_config());
        let err = recommend("Missing (2000)", &factors, 10).unwrap_err();
        assert!(matches!(err, EngineError::ItemNotFound { .. }));
    }
}
