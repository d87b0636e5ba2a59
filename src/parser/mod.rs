//! Frame reassembly for eval results embedded in test output
//!
//! Eval tests log their result as a JSON payload wrapped in a pair of
//! markers. The test runner may split a long log line into several output
//! events, so the parser accumulates fragments until the closing marker
//! shows up.
//!
//! # Example
//!
//! ```rust
//! use evalscope::parser::FrameParser;
//!
//! let mut parser = FrameParser::new();
//! let line = r#"{"Action":"output","Test":"TestEvalPing","Output":"    parse_test.go:42: EVALRESULT🌜{\"Sample\":{\"Input\":\"ping\"},\"Result\":{\"Score\":0.8,\"Type\":\"Exact\"},\"Duration\":1209}🌛EVALRESULT"}"#;
//!
//! let record = parser.parse(line)?.expect("single-line frame completes");
//! assert_eq!(record.name, "TestEvalPing");
//! assert_eq!(record.sample.input, "ping");
//! # Ok::<(), evalscope::Error>(())
//! ```

mod test_event;

pub use test_event::TestEvent;

use regex::Regex;
use tracing::{debug, warn};

use crate::eval::EvalRecord;
use crate::{Error, Result};

/// Marker opening a framed eval payload.
pub const OPEN_MARKER: &str = "EVALRESULT🌜";
/// Marker closing a framed eval payload.
pub const CLOSE_MARKER: &str = "🌛EVALRESULT";
/// Prefix of test names that carry eval results.
pub const TEST_PREFIX: &str = "TestEval";
/// Strips the `    file_test.go:42: ` location prefix of a log line.
pub const OUTPUT_PATTERN: &str = r"(?s)^\s+[\w.]+:\d+:\s(.+)";

/// Markers and patterns used by one [`FrameParser`].
#[derive(Debug, Clone)]
pub struct ParserConfig {
    open_marker: String,
    close_marker: String,
    test_prefix: String,
    output_pattern: Regex,
}

impl ParserConfig {
    /// Build a configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if a marker is empty or the pattern
    /// does not compile or has no capture group.
    pub fn new(
        open_marker: impl Into<String>,
        close_marker: impl Into<String>,
        test_prefix: impl Into<String>,
        output_pattern: &str,
    ) -> Result<Self> {
        let open_marker = open_marker.into();
        let close_marker = close_marker.into();
        if open_marker.is_empty() || close_marker.is_empty() {
            return Err(Error::InvalidConfig("frame markers must not be empty".into()));
        }
        let output_pattern = Regex::new(output_pattern)
            .map_err(|e| Error::InvalidConfig(format!("output pattern: {e}")))?;
        if output_pattern.captures_len() < 2 {
            return Err(Error::InvalidConfig(
                "output pattern needs a capture group for the payload".into(),
            ));
        }
        Ok(Self {
            open_marker,
            close_marker,
            test_prefix: test_prefix.into(),
            output_pattern,
        })
    }

    /// Opening marker.
    #[must_use]
    pub fn open_marker(&self) -> &str {
        &self.open_marker
    }

    /// Closing marker.
    #[must_use]
    pub fn close_marker(&self) -> &str {
        &self.close_marker
    }

    /// Recognized test name prefix.
    #[must_use]
    pub fn test_prefix(&self) -> &str {
        &self.test_prefix
    }

    /// Payload of a fragment that starts with a location prefix. A match
    /// further in belongs to the payload itself.
    fn extract<'a>(&self, fragment: &'a str) -> Option<&'a str> {
        self.output_pattern
            .captures(fragment)
            .filter(|c| c.get(0).is_some_and(|m| m.start() == 0))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new(OPEN_MARKER, CLOSE_MARKER, TEST_PREFIX, OUTPUT_PATTERN)
            .expect("default parser config is valid")
    }
}

/// Reassembly state. Only one frame can be open at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FrameState {
    /// No frame in progress.
    #[default]
    Idle,
    /// A frame was opened and is waiting for its closing marker.
    Accumulating {
        /// Test that opened the frame.
        test: String,
        /// Payload so far, opening marker stripped.
        buffer: String,
    },
}

/// Streaming parser turning test output lines into eval records.
///
/// An unterminated frame keeps growing until the stream ends; see
/// [`FrameParser::pending_len`].
#[derive(Debug, Default)]
pub struct FrameParser {
    config: ParserConfig,
    state: FrameState,
    lines: usize,
}

impl FrameParser {
    /// Create a parser with the default markers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with custom markers.
    #[must_use]
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            state: FrameState::Idle,
            lines: 0,
        }
    }

    /// Current reassembly state.
    #[must_use]
    pub const fn state(&self) -> &FrameState {
        &self.state
    }

    /// Whether a frame is open.
    #[must_use]
    pub const fn is_accumulating(&self) -> bool {
        matches!(self.state, FrameState::Accumulating { .. })
    }

    /// Bytes buffered for the open frame, zero when idle.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        match &self.state {
            FrameState::Idle => 0,
            FrameState::Accumulating { buffer, .. } => buffer.len(),
        }
    }

    /// Number of lines fed so far.
    #[must_use]
    pub const fn lines_seen(&self) -> usize {
        self.lines
    }

    /// Feed one raw line. Returns the record once a frame is complete.
    /// Blank lines are counted and skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedEvent` if the line is not a test event and
    /// `Error::MalformedFrame` if a complete frame does not decode. Both
    /// mean the stream is out of sync and the caller should stop.
    pub fn parse(&mut self, line: &str) -> Result<Option<EvalRecord>> {
        self.lines += 1;
        if line.trim().is_empty() {
            return Ok(None);
        }
        let event: TestEvent = serde_json::from_str(line).map_err(|source| {
            Error::MalformedEvent {
                line: self.lines,
                source,
            }
        })?;

        let test = event.test_name();
        if !event.is_output() || !test.starts_with(&self.config.test_prefix) {
            return Ok(None);
        }
        let Some(fragment) = event.output.as_deref() else {
            return Ok(None);
        };

        let payload = match self.config.extract(fragment) {
            Some(matched) => matched.trim(),
            // Continuation events carry no location prefix.
            None if self.is_accumulating() => {
                fragment.trim_end_matches(|c: char| c == '\n' || c == '\r')
            }
            None => return Ok(None),
        };

        let open = self.config.open_marker.as_str();
        let close = self.config.close_marker.as_str();

        if let Some(body) = payload
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            let mut record = self.decode(body, test)?;
            if record.name.is_empty() {
                record.name = test.to_string();
            }
            debug!(test, line = self.lines, "complete eval frame");
            return Ok(Some(record));
        }

        if let Some(rest) = payload.strip_prefix(open) {
            if let FrameState::Accumulating { test: previous, buffer } = &self.state {
                warn!(
                    previous = previous.as_str(),
                    dropped_bytes = buffer.len(),
                    line = self.lines,
                    "new eval frame opened before the previous one closed"
                );
            }
            debug!(test, line = self.lines, "eval frame opened");
            self.state = FrameState::Accumulating {
                test: test.to_string(),
                buffer: rest.to_string(),
            };
            return Ok(None);
        }

        let closed = match &mut self.state {
            FrameState::Idle => return Ok(None),
            FrameState::Accumulating { buffer, .. } => {
                buffer.push_str(payload);
                buffer.ends_with(close)
            }
        };
        if !closed {
            return Ok(None);
        }

        let FrameState::Accumulating {
            test: opened_by,
            buffer,
        } = std::mem::take(&mut self.state)
        else {
            return Ok(None);
        };
        if opened_by != test {
            warn!(
                opened_by = opened_by.as_str(),
                closed_by = test,
                line = self.lines,
                "eval frame closed by a different test"
            );
        }

        let body = buffer.strip_prefix(open).unwrap_or(&buffer);
        let body = body.strip_suffix(close).unwrap_or(body);
        let mut record = self.decode(body, test)?;
        record.name = test.to_string();
        debug!(test, line = self.lines, "reassembled eval frame");
        Ok(Some(record))
    }

    fn decode(&self, body: &str, test: &str) -> Result<EvalRecord> {
        serde_json::from_str(body).map_err(|source| Error::MalformedFrame {
            line: self.lines,
            test: test.to_string(),
            source,
        })
    }
}
