//! # Engine Crate
//!
//! The core recommendation engine: builds the user-item rating matrix
//! and ranks similar movies with two interchangeable strategies.
//!
//! ## Components
//!
//! ### Matrix (`matrix`)
//! Joins ratings with the movie catalog, applies the popularity
//! threshold, and produces the typed user-by-title rating table with an
//! explicit "never rated" state.
//!
//! ### Correlation strategy (`correlation`)
//! Item-item Pearson correlation computed over co-rating users only,
//! with a `min_periods` floor below which a pair is undefined.
//!
//! ### Factorization strategy (`factorization`)
//! Seeded non-negative matrix factorization of the zero-filled matrix;
//! neighbors ranked by cosine similarity of item latent vectors.
//!
//! ## Example Usage
//!
//! ```ignore
//! use engine::{build_matrix, correlation, factorization, NmfConfig};
//!
//! let matrix = build_matrix(&dataset.ratings, &dataset.movies, 100)?;
//!
//! let similarity = correlation::compute_similarity(&matrix, 100);
//! let classic = correlation::recommend("Toy Story (1995)", &similarity, 10)?;
//!
//! let factors = factorization::factorize(&matrix, &NmfConfig::default());
//! let latent = factorization::recommend("Toy Story (1995)", &factors, 10)?;
//! ```
//!
//! All operations are pure functions over immutable inputs; nothing in
//! this crate holds shared mutable state, so any number of requests may
//! run concurrently against the same matrix.

pub mod correlation;
pub mod error;
pub mod factorization;
pub mod matrix;
pub mod types;

pub use correlation::SimilarityMatrix;
pub use error::{EngineError, Result};
pub use factorization::{LatentFactors, NmfConfig};
pub use matrix::{RatingMatrix, build_matrix};
pub use types::Scored;
