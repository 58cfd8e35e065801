//! Construction of the user-item rating matrix.
//!
//! Rows are users, columns are movie titles that pass the popularity
//! threshold. A cell is `None` when the (user, movie) pair has no
//! rating record; absence is a distinct state, never conflated with an
//! explicit 0.0 rating.

use crate::error::{EngineError, Result};
use data_loader::{MovieCatalog, Rating, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Dense user-by-title table of observed ratings.
///
/// Row and column orders are sorted (user id ascending, title
/// lexicographic) so identical inputs always produce an identical
/// matrix. Serializable because it travels inside model snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingMatrix {
    user_ids: Vec<UserId>,
    titles: Vec<String>,
    user_index: HashMap<UserId, usize>,
    title_index: HashMap<String, usize>,
    /// Row-major, `user_ids.len() * titles.len()` cells
    cells: Vec<Option<f32>>,
}

impl RatingMatrix {
    pub fn n_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn n_items(&self) -> usize {
        self.titles.len()
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    pub fn has_title(&self, title: &str) -> bool {
        self.title_index.contains_key(title)
    }

    /// Column position of a title, if it survived the popularity filter.
    pub fn title_position(&self, title: &str) -> Option<usize> {
        self.title_index.get(title).copied()
    }

    /// Cell by matrix position. `None` means the user never rated the movie.
    pub fn value_at(&self, row: usize, col: usize) -> Option<f32> {
        self.cells[row * self.titles.len() + col]
    }

    /// Cell by domain key.
    pub fn get(&self, user_id: UserId, title: &str) -> Option<f32> {
        let row = *self.user_index.get(&user_id)?;
        let col = *self.title_index.get(title)?;
        self.value_at(row, col)
    }

    /// One full column (all users) for a title.
    pub fn column(&self, title: &str) -> Option<Vec<Option<f32>>> {
        let col = self.title_position(title)?;
        Some((0..self.n_users()).map(|row| self.value_at(row, col)).collect())
    }

    /// Number of non-absent cells in a column.
    pub fn column_rated_count(&self, title: &str) -> Option<usize> {
        let col = self.title_position(title)?;
        Some(
            (0..self.n_users())
                .filter(|&row| self.value_at(row, col).is_some())
                .count(),
        )
    }
}

/// Build the rating matrix from raw ratings joined against the catalog.
///
/// ## Algorithm
/// 1. Join each rating to a title by movie id (ratings without a
///    catalog entry are skipped, an inner join)
/// 2. Count joined rating records per title and retain titles with at
///    least `min_ratings` records
/// 3. Rows are the distinct users appearing in the retained ratings
/// 4. Duplicate (user, title) observations are averaged
pub fn build_matrix(
    ratings: &[Rating],
    catalog: &MovieCatalog,
    min_ratings: u32,
) -> Result<RatingMatrix> {
    // Join and count per title
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for rating in ratings {
        if let Some(title) = catalog.title_of(rating.movie_id) {
            *counts.entry(title).or_insert(0) += 1;
        }
    }

    // Popularity filter; BTreeMap iteration keeps titles sorted
    let titles: Vec<String> = counts
        .iter()
        .filter(|&(_, &count)| count >= min_ratings)
        .map(|(title, _)| title.to_string())
        .collect();

    if titles.is_empty() {
        return Err(EngineError::DataInsufficient { min_ratings });
    }

    let title_index: HashMap<String, usize> = titles
        .iter()
        .enumerate()
        .map(|(i, t)| (t.clone(), i))
        .collect();

    // Distinct users across the retained ratings, sorted
    let user_set: BTreeSet<UserId> = ratings
        .iter()
        .filter(|r| {
            catalog
                .title_of(r.movie_id)
                .is_some_and(|t| title_index.contains_key(t))
        })
        .map(|r| r.user_id)
        .collect();
    let user_ids: Vec<UserId> = user_set.into_iter().collect();
    let user_index: HashMap<UserId, usize> = user_ids
        .iter()
        .enumerate()
        .map(|(i, &u)| (u, i))
        .collect();

    // Fill cells, averaging duplicate observations
    let n_cols = titles.len();
    let mut sums = vec![0.0f64; user_ids.len() * n_cols];
    let mut hits = vec![0u32; user_ids.len() * n_cols];
    for rating in ratings {
        let Some(title) = catalog.title_of(rating.movie_id) else {
            continue;
        };
        let Some(&col) = title_index.get(title) else {
            continue;
        };
        let row = user_index[&rating.user_id];
        sums[row * n_cols + col] += rating.rating as f64;
        hits[row * n_cols + col] += 1;
    }

    let cells: Vec<Option<f32>> = sums
        .iter()
        .zip(&hits)
        .map(|(&sum, &hit)| (hit > 0).then(|| (sum / hit as f64) as f32))
        .collect();

    debug!(
        "Built rating matrix: {} users x {} movies (min_ratings = {})",
        user_ids.len(),
        n_cols,
        min_ratings
    );

    Ok(RatingMatrix {
        user_ids,
        titles,
        user_index,
        title_index,
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Movie;

    fn catalog(titles: &[(u32, &str)]) -> MovieCatalog {
        let mut catalog = MovieCatalog::new();
        for &(id, title) in titles {
            catalog.insert(Movie {
                id,
                title: title.to_string(),
            });
        }
        catalog
    }

    fn rating(user_id: u32, movie_id: u32, value: f32) -> Rating {
        Rating {
            user_id,
            movie_id,
            rating: value,
            timestamp: 0,
        }
    }

    #[test]
    fn popularity_threshold_is_inclusive() {
        let catalog = catalog(&[(1, "Popular (1995)"), (2, "Niche (1996)")]);
        // Popular: 3 ratings, Niche: 2 ratings
        let ratings = vec![
            rating(1, 1, 5.0),
            rating(2, 1, 4.0),
            rating(3, 1, 3.0),
            rating(1, 2, 2.0),
            rating(2, 2, 1.0),
        ];

        let matrix = build_matrix(&ratings, &catalog, 3).unwrap();
        // Exactly min_ratings is included, min_ratings - 1 is excluded
        assert!(matrix.has_title("Popular (1995)"));
        assert!(!matrix.has_title("Niche (1996)"));
    }

    #[test]
    fn absence_is_distinct_from_zero() {
        let catalog = catalog(&[(1, "A (1990)"), (2, "B (1991)")]);
        let ratings = vec![
            rating(1, 1, 0.0),
            rating(2, 1, 3.0),
            rating(2, 2, 4.0),
            rating(3, 2, 5.0),
        ];

        let matrix = build_matrix(&ratings, &catalog, 2).unwrap();
        assert_eq!(matrix.get(1, "A (1990)"), Some(0.0));
        assert_eq!(matrix.get(1, "B (1991)"), None);
    }

    #[test]
    fn no_surviving_title_is_data_insufficient() {
        let catalog = catalog(&[(1, "A (1990)")]);
        let ratings = vec![rating(1, 1, 5.0)];

        let err = build_matrix(&ratings, &catalog, 100).unwrap_err();
        assert!(matches!(err, EngineError::DataInsufficient { min_ratings: 100 }));
    }

    #[test]
    fn duplicate_observations_are_averaged() {
        let catalog = catalog(&[(1, "A (1990)")]);
        let ratings = vec![rating(1, 1, 2.0), rating(1, 1, 4.0)];

        let matrix = build_matrix(&ratings, &catalog, 2).unwrap();
        assert_eq!(matrix.get(1, "A (1990)"), Some(3.0));
    }

    #[test]
    fn ratings_without_catalog_entry_are_skipped() {
        let catalog = catalog(&[(1, "A (1990)")]);
        let ratings = vec![rating(1, 1, 5.0), rating(1, 99, 5.0), rating(2, 1, 4.0)];

        let matrix = build_matrix(&ratings, &catalog, 2).unwrap();
        assert_eq!(matrix.n_items(), 1);
        assert_eq!(matrix.n_users(), 2);
    }

    #[test]
    fn rows_cover_only_users_of_retained_titles() {
        let catalog = catalog(&[(1, "Kept (1990)"), (2, "Dropped (1991)")]);
        let ratings = vec![
            rating(1, 1, 5.0),
            rating(2, 1, 4.0),
            // User 9 only rated the movie that falls below the threshold
            rating(9, 2, 3.0),
        ];

        let matrix = build_matrix(&ratings, &catalog, 2).unwrap();
        assert_eq!(matrix.user_ids(), &[1, 2]);
    }

    #[test]
    fn every_column_meets_the_threshold() {
        let catalog = catalog(&[(1, "A (1990)"), (2, "B (1991)"), (3, "C (1992)")]);
        let mut ratings = Vec::new();
        for user in 1..=5 {
            ratings.push(rating(user, 1, 4.0));
            ratings.push(rating(user, 2, 3.0));
        }
        ratings.push(rating(1, 3, 5.0));

        let matrix = build_matrix(&ratings, &catalog, 4).unwrap();
        for title in matrix.titles() {
            assert!(matrix.column_rated_count(title).unwrap() >= 4);
        }
    }
}
