//! Error types for evalscope
//!
//! Structural decode failures and store failures are fatal for a run: the
//! binary aborts on any of them. Only notification errors are recoverable.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// evalscope error types
#[derive(Error, Debug)]
pub enum Error {
    /// A raw input line is not a valid harness event
    #[error("line {line}: malformed test event: {source}\nThe input stream is out of sync, aborting")]
    MalformedEvent {
        /// 1-based input line number
        line: usize,
        /// Underlying decode failure
        #[source]
        source: serde_json::Error,
    },

    /// A framed payload was assembled but does not decode as an eval record
    #[error("line {line}: malformed eval frame in {test}: {source}")]
    MalformedFrame {
        /// 1-based input line number that completed the frame
        line: usize,
        /// Test identity of the completing event
        test: String,
        /// Underlying decode failure
        #[source]
        source: serde_json::Error,
    },

    /// A line of an eval JSONL stream does not decode as an eval record
    #[error("line {line}: malformed eval record: {source}")]
    MalformedRecord {
        /// 1-based input line number
        line: usize,
        /// Underlying decode failure
        #[source]
        source: serde_json::Error,
    },

    /// Previous score lookup failed
    #[error("looking up previous score for {name} ({result_type}): {source}")]
    Lookup {
        /// Eval name
        name: String,
        /// Result type
        result_type: String,
        /// Store failure
        #[source]
        source: Box<Error>,
    },

    /// Writing a history entry failed
    #[error("inserting score for {name} ({result_type}): {source}")]
    Insert {
        /// Eval name
        name: String,
        /// Result type
        result_type: String,
        /// Store failure
        #[source]
        source: Box<Error>,
    },

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The history database was written by a newer version
    #[error("unsupported schema version {found} (this build supports up to {supported})\nUpgrade evalscope or point --db at another file")]
    UnsupportedSchema {
        /// Version found in the database
        found: i64,
        /// Highest version this build knows
        supported: i64,
    },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Notification failed
    #[error("notification failed: {0}")]
    Notify(String),
}

impl Error {
    /// Whether this error means the input stream can no longer be trusted.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(
            self,
            Self::MalformedEvent { .. } | Self::MalformedFrame { .. } | Self::MalformedRecord { .. }
        )
    }
}
