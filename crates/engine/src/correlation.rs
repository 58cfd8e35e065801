//! Correlation-based similarity: item-item Pearson correlation over
//! co-rated users.
//!
//! ## Algorithm
//! For every pair of matrix columns, correlate only the rows where both
//! movies were actually rated. Pairs with fewer than `min_periods`
//! co-rating users are undefined, not zero, and never enter a ranking.

use crate::error::{EngineError, Result};
use crate::matrix::RatingMatrix;
use crate::types::{Scored, rank_descending};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Square, symmetric item-item correlation matrix.
///
/// `None` cells are undefined pairs (too few co-raters, or zero
/// variance on one side). The diagonal is self-correlation, 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    titles: Vec<String>,
    title_index: HashMap<String, usize>,
    values: Vec<Option<f32>>,
}

impl SimilarityMatrix {
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn has_title(&self, title: &str) -> bool {
        self.title_index.contains_key(title)
    }

    /// Correlation between two titles, if both exist and the pair is defined.
    pub fn get(&self, a: &str, b: &str) -> Option<f32> {
        let i = *self.title_index.get(a)?;
        let j = *self.title_index.get(b)?;
        self.values[i * self.titles.len() + j]
    }
}

/// Compute the Pearson correlation matrix between all movie columns.
///
/// Upper-triangle pairs are computed in parallel and mirrored; the
/// result is symmetric by construction.
pub fn compute_similarity(matrix: &RatingMatrix, min_periods: usize) -> SimilarityMatrix {
    let n = matrix.n_items();

    let upper: Vec<Vec<Option<f32>>> = (0..n)
        .into_par_iter()
        .map(|i| {
            ((i + 1)..n)
                .map(|j| pearson(matrix, i, j, min_periods))
                .collect()
        })
        .collect();

    let mut values = vec![None; n * n];
    for (i, row) in upper.iter().enumerate() {
        values[i * n + i] = Some(1.0);
        for (offset, &value) in row.iter().enumerate() {
            let j = i + 1 + offset;
            values[i * n + j] = value;
            values[j * n + i] = value;
        }
    }

    let defined = values.iter().filter(|v| v.is_some()).count();
    debug!(
        "Computed similarity matrix: {} movies, {}/{} defined cells (min_periods = {})",
        n,
        defined,
        n * n,
        min_periods
    );

    SimilarityMatrix {
        titles: matrix.titles().to_vec(),
        title_index: matrix
            .titles()
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect(),
        values,
    }
}

/// Pearson correlation of two columns over their co-rated rows.
///
/// Returns `None` when fewer than `min_periods` users rated both, or
/// when either side has zero variance over the co-rated rows.
fn pearson(matrix: &RatingMatrix, col_a: usize, col_b: usize, min_periods: usize) -> Option<f32> {
    let mut n = 0usize;
    let mut sum_a = 0.0f64;
    let mut sum_b = 0.0f64;
    let mut sum_aa = 0.0f64;
    let mut sum_bb = 0.0f64;
    let mut sum_ab = 0.0f64;

    for row in 0..matrix.n_users() {
        let (Some(a), Some(b)) = (matrix.value_at(row, col_a), matrix.value_at(row, col_b)) else {
            continue;
        };
        let (a, b) = (a as f64, b as f64);
        n += 1;
        sum_a += a;
        sum_b += b;
        sum_aa += a * a;
        sum_bb += b * b;
        sum_ab += a * b;
    }

    if n < min_periods || n < 2 {
        return None;
    }

    let n = n as f64;
    let cov = sum_ab - sum_a * sum_b / n;
    let var_a = sum_aa - sum_a * sum_a / n;
    let var_b = sum_bb - sum_b * sum_b / n;
    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        return None;
    }

    Some((cov / denom) as f32)
}

/// Rank the neighbors of `title` by correlation, best first.
///
/// Undefined pairs and the movie itself are dropped; ties break
/// lexicographically by title; at most `top_n` results are returned.
pub fn recommend(
    title: &str,
    similarity: &SimilarityMatrix,
    top_n: usize,
) -> Result<Vec<Scored>> {
    if !similarity.has_title(title) {
        return Err(EngineError::ItemNotFound {
            title: title.to_string(),
        });
    }

    let neighbors: Vec<Scored> = similarity
        .titles()
        .iter()
        .filter(|other| other.as_str() != title)
        .filter_map(|other| {
            similarity
                .get(title, other)
                .map(|score| Scored::new(other.clone(), score))
        })
        .collect();

    Ok(rank_descending(neighbors, top_n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::build_matrix;
    use data_loader::{Movie, MovieCatalog, Rating};

    /// Three movies, four users. A and B move together, C moves against them.
    fn fixture_matrix() -> RatingMatrix {
        let mut catalog = MovieCatalog::new();
        for (id, title) in [(1, "A (1990)"), (2, "B (1991)"), (3, "C (1992)")] {
            catalog.insert(Movie {
                id,
                title: title.to_string(),
            });
        }

        let mut ratings = Vec::new();
        for (user, value) in [(1u32, 5.0f32), (2, 1.0), (3, 5.0), (4, 1.0)] {
            ratings.push(Rating {
                user_id: user,
                movie_id: 1,
                rating: value,
                timestamp: 0,
            });
            ratings.push(Rating {
                user_id: user,
                movie_id: 2,
                rating: value,
                timestamp: 0,
            });
            ratings.push(Rating {
                user_id: user,
                movie_id: 3,
                rating: 6.0 - value,
                timestamp: 0,
            });
        }

        build_matrix(&ratings, &catalog, 4).unwrap()
    }

    #[test]
    fn identical_columns_correlate_at_one() {
        let similarity = compute_similarity(&fixture_matrix(), 2);
        let r = similarity.get("A (1990)", "B (1991)").unwrap();
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposite_columns_correlate_at_minus_one() {
        let similarity = compute_similarity(&fixture_matrix(), 2);
        let r = similarity.get("A (1990)", "C (1992)").unwrap();
        assert!((r + 1.0).abs() < 1e-6);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let similarity = compute_similarity(&fixture_matrix(), 2);
        assert_eq!(
            similarity.get("A (1990)", "C (1992)"),
            similarity.get("C (1992)", "A (1990)")
        );
        assert_eq!(similarity.get("B (1991)", "B (1991)"), Some(1.0));
    }

    #[test]
    fn too_few_co_raters_is_undefined() {
        let similarity = compute_similarity(&fixture_matrix(), 5);
        assert_eq!(similarity.get("A (1990)", "B (1991)"), None);
    }

    #[test]
    fn recommend_excludes_self_and_sorts_descending() {
        let matrix = fixture_matrix();
        let similarity = compute_similarity(&matrix, 2);
        let recs = recommend("A (1990)", &similarity, 10).unwrap();

        assert!(recs.iter().all(|s| s.title != "A (1990)"));
        assert_eq!(recs[0].title, "B (1991)");
        assert_eq!(recs[1].title, "C (1992)");
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn recommend_respects_top_n() {
        let similarity = compute_similarity(&fixture_matrix(), 2);
        let recs = recommend("A (1990)", &similarity, 1).unwrap();
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn recommend_drops_undefined_pairs() {
        // min_periods above the co-rater count leaves only the diagonal
        let similarity = compute_similarity(&fixture_matrix(), 5);
        let recs = recommend("A (1990)", &similarity, 10).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn unknown_title_is_item_not_found() {
        let similarity = compute_similarity(&fixture_matrix(), 2);
        let err = recommend("Missing (2000)", &similarity, 10).unwrap_err();
        assert!(matches!(err, EngineError::ItemNotFound { .. }));
    }
}
