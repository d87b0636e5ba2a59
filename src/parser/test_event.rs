//! Harness events as written by `go test -json`

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One line of a test2json stream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TestEvent {
    /// When the event was emitted.
    pub time: Option<DateTime<Utc>>,
    /// Event kind: `run`, `output`, `pass`, `fail`, ...
    pub action: String,
    /// Package under test.
    pub package: Option<String>,
    /// Test identity, absent for package-level events.
    pub test: Option<String>,
    /// Output fragment for `output` events.
    pub output: Option<String>,
    /// Elapsed seconds for terminal events.
    pub elapsed: Option<f64>,
}

impl TestEvent {
    /// Whether this is an `output` event.
    #[must_use]
    pub fn is_output(&self) -> bool {
        self.action == "output"
    }

    /// Test identity, or an empty string for package-level events.
    #[must_use]
    pub fn test_name(&self) -> &str {
        self.test.as_deref().unwrap_or_default()
    }
}
