//! Append-only CSV log of user reactions to prior recommendations.
//!
//! The log is written by the presentation boundary after a user rates a
//! recommendation and consumed only by the model updater. Writers
//! append rows, creating the file with a header only when it does not
//! already exist.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One user reaction to a recommendation.
///
/// Field names double as the CSV column names:
/// `selected_movie,recommended_movie,similarity_score,user_rating,timestamp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// The movie the user asked about
    pub selected_movie: String,
    /// The movie that was recommended to them
    pub recommended_movie: String,
    /// The similarity score shown with the recommendation
    pub similarity_score: f32,
    /// The user's 1-5 verdict on the recommendation
    pub user_rating: f32,
    /// RFC 3339 timestamp of the reaction
    pub timestamp: String,
}

/// Feedback rows read back from disk, with a count of rows that failed
/// to parse and were skipped.
#[derive(Debug)]
pub struct LoadedFeedback {
    pub records: Vec<FeedbackRecord>,
    pub skipped: usize,
}

/// Handle to the append-only feedback file.
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append records, writing the header only on first creation.
    pub fn append(&self, records: &[FeedbackRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);

        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        debug!(
            "Appended {} feedback records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read the whole log. `Ok(None)` when the file does not exist yet;
    /// a row that fails to parse is skipped and counted rather than
    /// failing the whole load, so one bad line cannot block an update.
    pub fn load(&self) -> Result<Option<LoadedFeedback>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (idx, row) in reader.deserialize::<FeedbackRecord>().enumerate() {
            match row {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping malformed feedback row {}: {}", idx + 1, e);
                }
            }
        }

        Ok(Some(LoadedFeedback { records, skipped }))
    }
}
