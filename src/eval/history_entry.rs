//! History Entry - one persisted score

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{EvalRecord, Sample, ScoreResult};

/// History Entry represents one score recorded under an experiment label.
///
/// Entries are append-only. The evaluation identity used for trend lookups
/// is `(name, result_type)`. Sample fields are stored in full, never
/// truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    experiment: String,
    group: Option<String>,
    name: String,
    sample: Sample,
    result_type: String,
    score: f64,
    duration: Duration,
    created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Create an entry for one result of a record, stamped now.
    #[must_use]
    pub fn from_result(
        experiment: impl Into<String>,
        record: &EvalRecord,
        result: &ScoreResult,
    ) -> Self {
        let mut builder = Self::builder(
            experiment,
            record.name.clone(),
            result.result_type.clone(),
            result.score,
        )
        .sample(record.sample.clone())
        .duration(record.duration);
        if let Some(group) = &record.group {
            builder = builder.group(group.clone());
        }
        builder.build()
    }

    /// Create a builder for constructing an entry with optional fields.
    #[must_use]
    pub fn builder(
        experiment: impl Into<String>,
        name: impl Into<String>,
        result_type: impl Into<String>,
        score: f64,
    ) -> HistoryEntryBuilder {
        HistoryEntryBuilder::new(experiment, name, result_type, score)
    }

    /// Get the experiment label.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Get the group label, if any.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Get the eval name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the sample.
    #[must_use]
    pub const fn sample(&self) -> &Sample {
        &self.sample
    }

    /// Get the result type.
    #[must_use]
    pub fn result_type(&self) -> &str {
        &self.result_type
    }

    /// Get the score.
    #[must_use]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Get the eval duration.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Get the time the entry was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether this entry belongs to the given evaluation identity.
    #[must_use]
    pub fn matches(&self, name: &str, result_type: &str) -> bool {
        self.name == name && self.result_type == result_type
    }
}

/// Builder for `HistoryEntry`.
#[derive(Debug)]
pub struct HistoryEntryBuilder {
    experiment: String,
    group: Option<String>,
    name: String,
    sample: Sample,
    result_type: String,
    score: f64,
    duration: Duration,
    created_at: DateTime<Utc>,
}

impl HistoryEntryBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        experiment: impl Into<String>,
        name: impl Into<String>,
        result_type: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            experiment: experiment.into(),
            group: None,
            name: name.into(),
            sample: Sample::default(),
            result_type: result_type.into(),
            score,
            duration: Duration::ZERO,
            created_at: Utc::now(),
        }
    }

    /// Set the group label.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set the sample.
    #[must_use]
    pub fn sample(mut self, sample: Sample) -> Self {
        self.sample = sample;
        self
    }

    /// Set the eval duration.
    #[must_use]
    pub const fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set a custom creation timestamp.
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `HistoryEntry`.
    #[must_use]
    pub fn build(self) -> HistoryEntry {
        HistoryEntry {
            experiment: self.experiment,
            group: self.group,
            name: self.name,
            sample: self.sample,
            result_type: self.result_type,
            score: self.score,
            duration: self.duration,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result_keeps_full_sample() {
        let long = "x".repeat(200);
        let record = EvalRecord::new(
            "TestEvalLong",
            Sample::new(long.clone(), "e", "o"),
            ScoreResult::new(0.4, "ExactMatch"),
            Duration::from_millis(3),
        )
        .with_group("g1");

        let entry = HistoryEntry::from_result("exp-1", &record, &record.results[0]);

        assert_eq!(entry.experiment(), "exp-1");
        assert_eq!(entry.group(), Some("g1"));
        assert_eq!(entry.sample().input, long);
        assert_eq!(entry.duration(), Duration::from_millis(3));
        assert!(entry.matches("TestEvalLong", "ExactMatch"));
        assert!(!entry.matches("TestEvalLong", "Other"));
    }

    #[test]
    fn test_builder_defaults() {
        let entry = HistoryEntry::builder("exp", "n", "t", 0.5).build();
        assert!(entry.group().is_none());
        assert_eq!(entry.sample(), &Sample::default());
        assert_eq!(entry.duration(), Duration::ZERO);
        assert!(entry.created_at().timestamp() > 0);
    }
}
