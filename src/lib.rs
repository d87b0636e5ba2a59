//! # evalscope: Evaluation Log Ingestion
//!
//! evalscope reads the output of eval test runs, reassembles the framed
//! eval results the tests log (even when the test runner split them over
//! several lines), compares every score with the latest recorded score of
//! the same eval and keeps the history in SQLite.
//!
//! ## Pipeline
//!
//! ```text
//! raw lines ─> FrameParser ─> EvalRecord ─> ScoreTracker ─> ReportRow ─> ReportAggregator
//!                                               │
//!                                               └─> ScoreStore (append-only history)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use evalscope::history::MemoryScoreStore;
//! use evalscope::pipeline::Pipeline;
//! use evalscope::tracker::ScoreTracker;
//!
//! let input = r#"{"Action":"output","Test":"TestEvalPing","Output":"    parse_test.go:42: EVALRESULT🌜{\"Sample\":{\"Input\":\"ping\",\"Expected\":\"pong\",\"Output\":\"plong\"},\"Result\":{\"Score\":0.8,\"Type\":\"LevenshteinDistance\"},\"Duration\":1209}🌛EVALRESULT"}"#;
//!
//! let tracker = ScoreTracker::new(MemoryScoreStore::new(), "exp-001");
//! let mut pipeline = Pipeline::new(tracker);
//! pipeline.run(input.as_bytes())?;
//!
//! let report = pipeline.finish().report.render();
//! assert!(report.contains("| TestEvalPing | LevenshteinDistance | 0.80 (new) | 0s |"));
//! # Ok::<(), evalscope::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod eval;
pub mod history;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod tracker;

pub use error::{Error, Result};
