//! Score history storage
//!
//! Scores are append-only. The tracker asks for the latest score of an
//! evaluation identity `(name, result_type)` and then appends the new one.
//!
//! # Example
//!
//! ```rust
//! use evalscope::eval::HistoryEntry;
//! use evalscope::history::{MemoryScoreStore, ScoreStore};
//!
//! let mut store = MemoryScoreStore::new();
//! assert_eq!(store.latest_score("TestEvalPing", "Exact")?, None);
//!
//! store.insert(&HistoryEntry::builder("exp-1", "TestEvalPing", "Exact", 0.7).build())?;
//! store.insert(&HistoryEntry::builder("exp-2", "TestEvalPing", "Exact", 0.75).build())?;
//! assert_eq!(store.latest_score("TestEvalPing", "Exact")?, Some(0.75));
//! # Ok::<(), evalscope::Error>(())
//! ```

mod memory;
mod sqlite;

pub use memory::MemoryScoreStore;
pub use sqlite::{SqliteScoreStore, SCHEMA_VERSION};

use crate::eval::HistoryEntry;
use crate::Result;

/// Append-only store of scores.
pub trait ScoreStore {
    /// Latest score recorded for `(name, result_type)`.
    ///
    /// `None` means no score has been recorded yet; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn latest_score(&self, name: &str, result_type: &str) -> Result<Option<f64>>;

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    fn insert(&mut self, entry: &HistoryEntry) -> Result<()>;

    /// All entries for `(name, result_type)`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn entries_for(&self, name: &str, result_type: &str) -> Result<Vec<HistoryEntry>>;
}

impl<S: ScoreStore + ?Sized> ScoreStore for &mut S {
    fn latest_score(&self, name: &str, result_type: &str) -> Result<Option<f64>> {
        (**self).latest_score(name, result_type)
    }

    fn insert(&mut self, entry: &HistoryEntry) -> Result<()> {
        (**self).insert(entry)
    }

    fn entries_for(&self, name: &str, result_type: &str) -> Result<Vec<HistoryEntry>> {
        (**self).entries_for(name, result_type)
    }
}
