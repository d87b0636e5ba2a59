//! Eval Record - one evaluation run as emitted by the test harness

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::duration::nanos;

/// The input, expected output and actual output of one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Sample {
    /// Input given to the system under evaluation.
    pub input: String,
    /// Expected output.
    pub expected: String,
    /// Actual output.
    pub output: String,
}

impl Sample {
    /// Create a sample from its three parts.
    #[must_use]
    pub fn new(
        input: impl Into<String>,
        expected: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
            output: output.into(),
        }
    }
}

/// A score produced by one scoring method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Score, nominally in `[0, 1]`.
    #[serde(rename = "Score")]
    pub score: f64,
    /// Scoring method, e.g. `LevenshteinDistance`.
    #[serde(rename = "Type")]
    pub result_type: String,
}

impl ScoreResult {
    /// Create a result.
    #[must_use]
    pub fn new(score: f64, result_type: impl Into<String>) -> Self {
        Self {
            score,
            result_type: result_type.into(),
        }
    }

    /// Whether the score lies in the nominal `[0, 1]` range.
    #[must_use]
    pub fn in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.score)
    }
}

/// A decoded evaluation record.
///
/// Accepts both the single `Result` and the list `Results` encodings on the
/// way in; always serializes `Results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", from = "EvalRecordWire")]
pub struct EvalRecord {
    /// Evaluation name, the first half of the evaluation identity.
    pub name: String,
    /// Optional group label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Evaluated sample.
    pub sample: Sample,
    /// One or more scores.
    pub results: Vec<ScoreResult>,
    /// Time the evaluation took.
    #[serde(with = "nanos")]
    pub duration: Duration,
}

impl EvalRecord {
    /// Create a record with a single result and no group.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        sample: Sample,
        result: ScoreResult,
        duration: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            group: None,
            sample,
            results: vec![result],
            duration,
        }
    }

    /// Set the group label.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// First result, for records that carry exactly one.
    #[must_use]
    pub fn result(&self) -> Option<&ScoreResult> {
        self.results.first()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EvalRecordWire {
    #[serde(default)]
    name: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    sample: Sample,
    #[serde(default)]
    result: Option<ScoreResult>,
    #[serde(default)]
    results: Vec<ScoreResult>,
    #[serde(default, with = "nanos")]
    duration: Duration,
}

impl From<EvalRecordWire> for EvalRecord {
    fn from(wire: EvalRecordWire) -> Self {
        let mut results = Vec::with_capacity(wire.results.len() + 1);
        results.extend(wire.result);
        results.extend(wire.results);
        Self {
            name: wire.name,
            group: wire.group.filter(|g| !g.is_empty()),
            sample: wire.sample,
            results,
            duration: wire.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_result() {
        let json = r#"{"Sample":{"Input":"ping","Expected":"pong","Output":"plong"},"Result":{"Score":0.8,"Type":"LevenshteinDistance"},"Duration":1209}"#;
        let record: EvalRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.name, "");
        assert_eq!(record.sample, Sample::new("ping", "pong", "plong"));
        assert_eq!(record.results.len(), 1);
        assert!((record.results[0].score - 0.8).abs() < f64::EPSILON);
        assert_eq!(record.results[0].result_type, "LevenshteinDistance");
        assert_eq!(record.duration, Duration::from_nanos(1209));
    }

    #[test]
    fn test_decode_results_list_and_group() {
        let json = r#"{"Name":"TestEvalMulti","Group":"smoke","Results":[{"Score":1,"Type":"ExactMatch"},{"Score":0.5,"Type":"Embedding"}],"Duration":2000000}"#;
        let record: EvalRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.name, "TestEvalMulti");
        assert_eq!(record.group.as_deref(), Some("smoke"));
        assert_eq!(record.results.len(), 2);
        assert_eq!(record.results[1].result_type, "Embedding");
        assert_eq!(record.sample, Sample::default());
    }

    #[test]
    fn test_empty_group_is_none() {
        let json = r#"{"Name":"TestEvalX","Group":"","Results":[]}"#;
        let record: EvalRecord = serde_json::from_str(json).unwrap();
        assert!(record.group.is_none());
        assert!(record.results.is_empty());
        assert_eq!(record.duration, Duration::ZERO);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let json = r#"{"Name":"TestEvalX","Duration":-5}"#;
        assert!(serde_json::from_str::<EvalRecord>(json).is_err());
    }

    #[test]
    fn test_serializes_results_list() {
        let record = EvalRecord::new(
            "TestEvalPing",
            Sample::new("ping", "pong", "plong"),
            ScoreResult::new(0.8, "LevenshteinDistance"),
            Duration::from_nanos(1209),
        );
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["Results"][0]["Type"], "LevenshteinDistance");
        assert_eq!(value["Duration"], 1209);
        assert!(value.get("Group").is_none());
        assert!(value.get("Result").is_none());
    }

    #[test]
    fn test_in_range() {
        assert!(ScoreResult::new(0.0, "t").in_range());
        assert!(ScoreResult::new(1.0, "t").in_range());
        assert!(!ScoreResult::new(1.5, "t").in_range());
    }
}
