//! Ingestion loop
//!
//! One line is fully parsed, tracked and persisted before the next one is
//! read. The first fatal error stops the loop; whatever was tracked before
//! it stays in the report and in the store.

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::eval::EvalRecord;
use crate::history::ScoreStore;
use crate::parser::FrameParser;
use crate::report::ReportAggregator;
use crate::tracker::ScoreTracker;
use crate::{Error, Result};

/// Shape of the input stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputFormat {
    /// `go test -json` events with framed eval results in their output.
    #[default]
    TestJson,
    /// One eval record JSON document per line.
    EvalJsonl,
}

impl InputFormat {
    /// Format implied by an input path: `.jsonl` files hold eval records,
    /// anything else (stdin included) is read as `go test -json` output.
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        if path.ends_with(".jsonl") {
            Self::EvalJsonl
        } else {
            Self::TestJson
        }
    }
}

impl FromStr for InputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "test-json" => Ok(Self::TestJson),
            "eval-jsonl" => Ok(Self::EvalJsonl),
            other => Err(Error::InvalidConfig(format!(
                "unknown input format '{other}', expected 'test-json' or 'eval-jsonl'"
            ))),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TestJson => "test-json",
            Self::EvalJsonl => "eval-jsonl",
        })
    }
}

/// Result of a finished run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Report rows and totals.
    pub report: ReportAggregator,
    /// Every record ingested, in arrival order.
    pub records: Vec<EvalRecord>,
    /// Number of input lines read.
    pub lines: usize,
}

/// Wires input lines through parsing, tracking and aggregation.
#[derive(Debug)]
pub struct Pipeline<S> {
    format: InputFormat,
    parser: FrameParser,
    tracker: ScoreTracker<S>,
    report: ReportAggregator,
    records: Vec<EvalRecord>,
    lines: usize,
}

impl<S: ScoreStore> Pipeline<S> {
    /// Create a pipeline reading `go test -json` input.
    #[must_use]
    pub fn new(tracker: ScoreTracker<S>) -> Self {
        let report = ReportAggregator::new(tracker.report_options());
        Self {
            format: InputFormat::default(),
            parser: FrameParser::new(),
            tracker,
            report,
            records: Vec::new(),
            lines: 0,
        }
    }

    /// Set the input format.
    #[must_use]
    pub const fn with_format(mut self, format: InputFormat) -> Self {
        self.format = format;
        self
    }

    /// Use a parser with custom markers.
    #[must_use]
    pub fn with_parser(mut self, parser: FrameParser) -> Self {
        self.parser = parser;
        self
    }

    /// Report collected so far.
    #[must_use]
    pub const fn report(&self) -> &ReportAggregator {
        &self.report
    }

    /// Records ingested so far.
    #[must_use]
    pub fn records(&self) -> &[EvalRecord] {
        &self.records
    }

    /// Process one raw line.
    ///
    /// # Errors
    ///
    /// Returns decode errors for corrupt input and store errors from the
    /// tracker. All of them are fatal for the run.
    pub fn feed_line(&mut self, line: &str) -> Result<()> {
        self.lines += 1;
        let record = match self.format {
            InputFormat::TestJson => self.parser.parse(line)?,
            InputFormat::EvalJsonl => {
                if line.trim().is_empty() {
                    return Ok(());
                }
                let record = serde_json::from_str(line).map_err(|source| {
                    Error::MalformedRecord {
                        line: self.lines,
                        source,
                    }
                })?;
                Some(record)
            }
        };

        if let Some(record) = record {
            for row in self.tracker.record(&record)? {
                self.report.push(row);
            }
            self.records.push(record);
        }
        Ok(())
    }

    /// Read `reader` to the end.
    ///
    /// # Errors
    ///
    /// Stops at the first read, decode or store error.
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<()> {
        debug!(format = %self.format, "reading input");
        for line in reader.lines() {
            self.feed_line(&line?)?;
        }

        if self.parser.is_accumulating() {
            warn!(
                pending_bytes = self.parser.pending_len(),
                "input ended inside an unterminated eval frame"
            );
        }
        info!(
            lines = self.lines,
            records = self.records.len(),
            results = self.report.len(),
            "input processed"
        );
        Ok(())
    }

    /// Drop the tracker and keep what the run produced.
    #[must_use]
    pub fn finish(self) -> RunOutcome {
        RunOutcome {
            report: self.report,
            records: self.records,
            lines: self.lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryScoreStore;

    #[test]
    fn test_format_from_str() {
        assert_eq!("test-json".parse::<InputFormat>().unwrap(), InputFormat::TestJson);
        assert_eq!("eval-jsonl".parse::<InputFormat>().unwrap(), InputFormat::EvalJsonl);
        assert!("xml".parse::<InputFormat>().is_err());
        assert_eq!(InputFormat::EvalJsonl.to_string(), "eval-jsonl");
    }

    #[test]
    fn test_format_for_path() {
        assert_eq!(InputFormat::for_path("evals.jsonl"), InputFormat::EvalJsonl);
        assert_eq!(InputFormat::for_path("-"), InputFormat::TestJson);
        assert_eq!(InputFormat::for_path("run.txt"), InputFormat::TestJson);
        assert_eq!(InputFormat::for_path("go-test.json"), InputFormat::TestJson);
    }

    #[test]
    fn test_eval_jsonl_input() {
        let input = concat!(
            r#"{"Name":"TestEvalB","Results":[{"Score":0.5,"Type":"Exact"}],"Duration":1000000}"#,
            "\n\n",
            r#"{"Name":"TestEvalA","Results":[{"Score":1,"Type":"Exact"}],"Duration":2000000}"#,
            "\n",
        );
        let tracker = ScoreTracker::new(MemoryScoreStore::new(), "exp");
        let mut pipeline = Pipeline::new(tracker).with_format(InputFormat::EvalJsonl);

        pipeline.run(input.as_bytes()).unwrap();
        let outcome = pipeline.finish();

        assert_eq!(outcome.lines, 3);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.report.len(), 2);
        assert_eq!(outcome.report.mean_score(), Some(0.75));
    }

    #[test]
    fn test_eval_jsonl_error_has_line_number() {
        let input = "{\"Name\":\"TestEvalA\"}\n{broken\n";
        let tracker = ScoreTracker::new(MemoryScoreStore::new(), "exp");
        let mut pipeline = Pipeline::new(tracker).with_format(InputFormat::EvalJsonl);

        let err = pipeline.run(input.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { line: 2, .. }));
        assert!(err.is_decode());
        assert_eq!(pipeline.records().len(), 1);
    }
}
