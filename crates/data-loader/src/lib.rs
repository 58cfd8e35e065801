//! # Data Loader Crate
//!
//! Loads the MovieLens 100k dataset: the tab-separated ratings file
//! (`u.data`) and the pipe-separated, Latin-1 encoded item metadata
//! file (`u.item`).
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, Rating, MovieCatalog, Dataset)
//! - **parser**: Parse the raw files into Rust structs
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::Dataset;
//! use std::path::Path;
//!
//! let dataset = Dataset::load_from_dir(Path::new("data/ml-100k"))?;
//! let (movies, ratings, users) = dataset.counts();
//! println!("{} movies, {} ratings from {} users", movies, ratings, users);
//! ```

pub mod error;
pub mod parser;
pub mod types;

pub use error::{DataError, Result};
pub use types::{Dataset, Movie, MovieCatalog, MovieId, Rating, UserId};

use std::path::Path;
use tracing::info;

impl Dataset {
    /// Load the dataset from a directory containing `u.data` and `u.item`.
    ///
    /// The two files are parsed in parallel; a missing file fails the
    /// whole load with [`DataError::FileNotFound`].
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        let ratings_path = data_dir.join("u.data");
        let movies_path = data_dir.join("u.item");

        let (ratings, movies) = rayon::join(
            || parser::parse_ratings(&ratings_path),
            || parser::parse_movies(&movies_path),
        );
        let ratings = ratings?;
        let movies = movies?;

        let mut catalog = MovieCatalog::new();
        for movie in movies {
            catalog.insert(movie);
        }

        let dataset = Dataset {
            movies: catalog,
            ratings,
        };
        let (n_movies, n_ratings, n_users) = dataset.counts();
        info!(
            "Loaded {} movies and {} ratings from {} users",
            n_movies, n_ratings, n_users
        );

        Ok(dataset)
    }
}
