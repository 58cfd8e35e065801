//! Shared result types for both recommendation strategies.

use serde::{Deserialize, Serialize};

/// One ranked neighbor: a movie title and its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored {
    pub title: String,
    pub score: f32,
}

impl Scored {
    pub fn new(title: impl Into<String>, score: f32) -> Self {
        Self {
            title: title.into(),
            score,
        }
    }
}

/// Sort candidates by score descending and truncate to `top_n`.
///
/// Equal scores tie-break lexicographically by title so that rankings
/// are deterministic and reproducible across runs.
pub(crate) fn rank_descending(mut scored: Vec<Scored>, top_n: usize) -> Vec<Scored> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.title.cmp(&b.title))
    });
    scored.truncate(top_n);
    scored
}
