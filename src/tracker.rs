//! Score history tracking
//!
//! For every result of a record the tracker looks up the latest score of
//! the same `(name, type)`, classifies the change, renders a report row and
//! appends the new score under the current experiment label.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use evalscope::eval::{EvalRecord, Sample, ScoreResult};
//! use evalscope::history::MemoryScoreStore;
//! use evalscope::tracker::{ScoreTracker, Trend};
//!
//! let record = |score| EvalRecord::new(
//!     "TestEvalPing",
//!     Sample::new("ping", "pong", "plong"),
//!     ScoreResult::new(score, "LevenshteinDistance"),
//!     Duration::from_millis(3),
//! );
//!
//! let mut first = ScoreTracker::new(MemoryScoreStore::new(), "exp-1");
//! assert_eq!(first.record(&record(0.70))?[0].trend(), Trend::New);
//!
//! let mut second = ScoreTracker::new(first.into_store(), "exp-2");
//! let rows = second.record(&record(0.75))?;
//! assert!(matches!(rows[0].trend(), Trend::Improved(_)));
//! assert!(rows[0].text().contains("0.75 (+0.05)"));
//! # Ok::<(), evalscope::Error>(())
//! ```

use tracing::{debug, warn};

use crate::eval::{EvalRecord, HistoryEntry};
use crate::history::ScoreStore;
use crate::report::{ReportOptions, ReportRow};
use crate::{Error, Result};

/// Score changes smaller than this are reported as unchanged.
pub const DEFAULT_TOLERANCE: f64 = 0.005;

/// Change of a score against the latest recorded one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trend {
    /// No previous score for this identity.
    New,
    /// Score went up by the given amount.
    Improved(f64),
    /// Score went down by the given amount.
    Regressed(f64),
    /// Change within tolerance.
    Unchanged,
}

impl Trend {
    /// Classify `current` against `previous`.
    ///
    /// A change counts once its magnitude reaches `tolerance`. With a
    /// tolerance of zero every difference counts.
    #[must_use]
    pub fn classify(current: f64, previous: Option<f64>, tolerance: f64) -> Self {
        let Some(previous) = previous else {
            return Self::New;
        };
        let delta = current - previous;
        if delta > 0.0 && delta >= tolerance {
            Self::Improved(delta)
        } else if delta < 0.0 && -delta >= tolerance {
            Self::Regressed(-delta)
        } else {
            Self::Unchanged
        }
    }

    /// Suffix shown after the score: ` (new)`, ` (+0.05)`, ` (-0.05)` or
    /// nothing.
    #[must_use]
    pub fn annotation(self) -> String {
        match self {
            Self::New => " (new)".to_string(),
            Self::Improved(d) => format!(" (+{d:.2})"),
            Self::Regressed(d) => format!(" (-{d:.2})"),
            Self::Unchanged => String::new(),
        }
    }
}

/// Correlates records with their score history.
#[derive(Debug)]
pub struct ScoreTracker<S> {
    store: S,
    experiment: String,
    tolerance: f64,
    options: ReportOptions,
}

impl<S: ScoreStore> ScoreTracker<S> {
    /// Create a tracker writing under `experiment`.
    #[must_use]
    pub fn new(store: S, experiment: impl Into<String>) -> Self {
        Self {
            store,
            experiment: experiment.into(),
            tolerance: DEFAULT_TOLERANCE,
            options: ReportOptions::default(),
        }
    }

    /// Set the classification tolerance.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for negative or non-finite values.
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "tolerance must be a finite, non-negative number, got {tolerance}"
            )));
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    /// Set the report layout.
    #[must_use]
    pub const fn with_report_options(mut self, options: ReportOptions) -> Self {
        self.options = options;
        self
    }

    /// Experiment label new scores are written under.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Classification tolerance.
    #[must_use]
    pub const fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Report layout.
    #[must_use]
    pub const fn report_options(&self) -> ReportOptions {
        self.options
    }

    /// Borrow the store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Track every result of `record`, returning one row per result.
    ///
    /// # Errors
    ///
    /// Returns `Error::Lookup` or `Error::Insert` when the store fails. The
    /// run should stop: a skipped insert is lost from history.
    pub fn record(&mut self, record: &EvalRecord) -> Result<Vec<ReportRow>> {
        if record.results.is_empty() {
            debug!(name = record.name.as_str(), "eval record without results");
        }

        let mut rows = Vec::with_capacity(record.results.len());
        for (i, result) in record.results.iter().enumerate() {
            if !result.in_range() {
                warn!(
                    name = record.name.as_str(),
                    result_type = result.result_type.as_str(),
                    score = result.score,
                    "score outside [0, 1]"
                );
            }

            let previous = self
                .store
                .latest_score(&record.name, &result.result_type)
                .map_err(|source| Error::Lookup {
                    name: record.name.clone(),
                    result_type: result.result_type.clone(),
                    source: Box::new(source),
                })?;
            let trend = Trend::classify(result.score, previous, self.tolerance);

            let entry = HistoryEntry::from_result(self.experiment.as_str(), record, result);
            self.store
                .insert(&entry)
                .map_err(|source| Error::Insert {
                    name: record.name.clone(),
                    result_type: result.result_type.clone(),
                    source: Box::new(source),
                })?;

            debug!(
                name = record.name.as_str(),
                result_type = result.result_type.as_str(),
                score = result.score,
                ?previous,
                ?trend,
                "tracked score"
            );
            let row = ReportRow::new(record, result, trend, self.options);
            rows.push(if i == 0 { row } else { row.continued() });
        }
        Ok(rows)
    }
}
