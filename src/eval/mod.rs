//! Evaluation data model
//!
//! ## Schema Overview
//!
//! ```text
//! EvalRecord (1) ──< ScoreResult (N)
//!      │                  │
//!      └──────────────────┴──> HistoryEntry (one per result, append-only)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use evalscope::eval::{EvalRecord, HistoryEntry};
//!
//! let json = r#"{"Name":"TestEvalPing","Sample":{"Input":"ping","Expected":"pong","Output":"plong"},
//!               "Result":{"Score":0.8,"Type":"LevenshteinDistance"},"Duration":1209}"#;
//! let record: EvalRecord = serde_json::from_str(json)?;
//!
//! let entry = HistoryEntry::from_result("exp-001", &record, &record.results[0]);
//! assert_eq!(entry.score(), 0.8);
//! # Ok::<(), serde_json::Error>(())
//! ```

mod duration;
mod eval_record;
mod history_entry;

pub use duration::{format_duration, round_duration};
pub use eval_record::{EvalRecord, Sample, ScoreResult};
pub use history_entry::{HistoryEntry, HistoryEntryBuilder};
