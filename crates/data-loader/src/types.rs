//! Core domain types for the MovieLens 100k dataset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a user (1-943 in MovieLens 100k)
pub type UserId = u32;

/// Unique identifier for a movie
pub type MovieId = u32;

/// Represents a movie from the item metadata file.
///
/// The metadata file carries many more descriptive fields (release date,
/// IMDb URL, genre flags); the engine only ever keys on the title, so
/// only id and title are retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
}

/// Represents a single rating from a user for a movie
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value from 1.0 to 5.0
    pub rating: f32,
    /// Unix timestamp when rating was made
    pub timestamp: i64,
}

/// Two-way lookup between movie ids and titles.
///
/// Titles are the human-facing key used throughout the engine, so the
/// catalog maintains both directions. If two movies share a title, the
/// first one inserted wins the `title -> id` slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieCatalog {
    movies: HashMap<MovieId, Movie>,
    title_to_id: HashMap<String, MovieId>,
}

impl MovieCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, movie: Movie) {
        self.title_to_id
            .entry(movie.title.clone())
            .or_insert(movie.id);
        self.movies.insert(movie.id, movie);
    }

    pub fn get(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// Resolve a movie id to its title.
    pub fn title_of(&self, id: MovieId) -> Option<&str> {
        self.movies.get(&id).map(|m| m.title.as_str())
    }

    /// Resolve an exact title back to a movie id.
    pub fn id_of(&self, title: &str) -> Option<MovieId> {
        self.title_to_id.get(title).copied()
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Movie> {
        self.movies.values()
    }
}

/// The loaded dataset: item metadata plus the raw rating records.
///
/// Both halves are immutable once loaded; downstream components build
/// their own derived structures (rating matrix, similarity matrix,
/// latent factors) without mutating this.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub movies: MovieCatalog,
    pub ratings: Vec<Rating>,
}

impl Dataset {
    /// Counts for logging/validation: (movies, ratings, distinct users)
    pub fn counts(&self) -> (usize, usize, usize) {
        let distinct_users: std::collections::HashSet<UserId> =
            self.ratings.iter().map(|r| r.user_id).collect();
        (self.movies.len(), self.ratings.len(), distinct_users.len())
    }
}
