//! In-memory score store.
//!
//! Data is lost when the store is dropped. Used by tests and dry runs.

use super::ScoreStore;
use crate::eval::HistoryEntry;
use crate::Result;

/// Score store backed by a `Vec` in insertion order.
#[derive(Debug, Default, Clone)]
pub struct MemoryScoreStore {
    entries: Vec<HistoryEntry>,
}

impl MemoryScoreStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}

impl ScoreStore for MemoryScoreStore {
    fn latest_score(&self, name: &str, result_type: &str) -> Result<Option<f64>> {
        Ok(self
            .entries
            .iter()
            .rev()
            .find(|e| e.matches(name, result_type))
            .map(HistoryEntry::score))
    }

    fn insert(&mut self, entry: &HistoryEntry) -> Result<()> {
        self.entries.push(entry.clone());
        Ok(())
    }

    fn entries_for(&self, name: &str, result_type: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.matches(name, result_type))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_is_last_inserted() {
        let mut store = MemoryScoreStore::new();
        store
            .insert(&HistoryEntry::builder("b", "n", "t", 0.2).build())
            .unwrap();
        store
            .insert(&HistoryEntry::builder("a", "n", "t", 0.9).build())
            .unwrap();

        assert_eq!(store.latest_score("n", "t").unwrap(), Some(0.9));
    }

    #[test]
    fn test_identity_includes_type() {
        let mut store = MemoryScoreStore::new();
        store
            .insert(&HistoryEntry::builder("e", "n", "t1", 0.2).build())
            .unwrap();

        assert_eq!(store.latest_score("n", "t2").unwrap(), None);
        assert_eq!(store.latest_score("m", "t1").unwrap(), None);
        assert_eq!(store.entries_for("n", "t1").unwrap().len(), 1);
        assert_eq!(store.len(), 1);
    }
}
