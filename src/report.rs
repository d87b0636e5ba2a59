//! Markdown trend report
//!
//! Rows arrive in input order and are printed sorted by `(name, type)` so
//! the report is stable across runs. Nothing is printed for an empty run.

use std::fmt::Write as _;
use std::io::Write;
use std::time::Duration;

use crate::eval::{format_duration, round_duration, EvalRecord, ScoreResult};
use crate::tracker::Trend;
use crate::Result;

/// Default character budget for sample cells.
pub const SAMPLE_WIDTH: usize = 50;

const ELLIPSIS: char = '…';

/// Report layout options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Show input, expected and output columns.
    pub show_samples: bool,
    /// Characters kept per sample cell before truncation.
    pub sample_width: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            show_samples: false,
            sample_width: SAMPLE_WIDTH,
        }
    }
}

impl ReportOptions {
    fn header(self) -> &'static str {
        if self.show_samples {
            "| Name | Input | Expected | Output | Type | Score | Duration |\n\
             | --- | --- | --- | --- | --- | --- | --: |\n"
        } else {
            "| Name | Type | Score | Duration |\n| --- | --- | --- | --: |\n"
        }
    }
}

/// One rendered `(eval, result)` row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    name: String,
    result_type: String,
    score: f64,
    duration: Duration,
    trend: Trend,
    text: String,
    first_result: bool,
}

impl ReportRow {
    /// Render a row for one result of a record.
    #[must_use]
    pub fn new(
        record: &EvalRecord,
        result: &ScoreResult,
        trend: Trend,
        options: ReportOptions,
    ) -> Self {
        let mut text = format!("| {} ", escape_cell(&record.name));
        if options.show_samples {
            for field in [
                &record.sample.input,
                &record.sample.expected,
                &record.sample.output,
            ] {
                let cell = escape_cell(&truncate(field, options.sample_width));
                let _ = write!(text, "| {cell} ");
            }
        }
        let _ = writeln!(
            text,
            "| {} | {:.2}{} | {} |",
            escape_cell(&result.result_type),
            result.score,
            trend.annotation(),
            format_duration(round_duration(record.duration)),
        );

        Self {
            name: record.name.clone(),
            result_type: result.result_type.clone(),
            score: result.score,
            duration: record.duration,
            trend,
            text,
            first_result: true,
        }
    }

    /// Mark this row as a further result of a record that already has a
    /// row, so its duration is not counted again in the totals.
    #[must_use]
    pub const fn continued(mut self) -> Self {
        self.first_result = false;
        self
    }

    /// Eval name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Result type.
    #[must_use]
    pub fn result_type(&self) -> &str {
        &self.result_type
    }

    /// Score of this result.
    #[must_use]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Duration of the eval.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Change against the previous score.
    #[must_use]
    pub const fn trend(&self) -> Trend {
        self.trend
    }

    /// Rendered markdown line, newline included.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Totals of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of rows.
    pub count: usize,
    /// Mean score, `None` for an empty run.
    pub mean_score: Option<f64>,
    /// Sum of eval durations, each record counted once.
    pub total_duration: Duration,
}

/// Collects report rows and renders the final table.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    options: ReportOptions,
    rows: Vec<ReportRow>,
    score_sum: f64,
    total_duration: Duration,
}

impl ReportAggregator {
    /// Create an aggregator.
    #[must_use]
    pub fn new(options: ReportOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Add a row.
    pub fn push(&mut self, row: ReportRow) {
        self.score_sum += row.score;
        if row.first_result {
            self.total_duration = self.total_duration.saturating_add(row.duration);
        }
        self.rows.push(row);
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no rows were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean score, `None` when empty.
    #[must_use]
    pub fn mean_score(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.rows.len() as f64;
        Some(self.score_sum / n)
    }

    /// Run totals.
    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            count: self.rows.len(),
            mean_score: self.mean_score(),
            total_duration: self.total_duration,
        }
    }

    /// Rows ordered by name, then type.
    #[must_use]
    pub fn sorted_rows(&self) -> Vec<&ReportRow> {
        let mut rows: Vec<&ReportRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.result_type.cmp(&b.result_type))
                .then_with(|| a.text.cmp(&b.text))
        });
        rows
    }

    /// Render the whole table. Empty for an empty run.
    #[must_use]
    pub fn render(&self) -> String {
        let Some(mean) = self.mean_score() else {
            return String::new();
        };

        let mut out = String::from(self.options.header());
        for row in self.sorted_rows() {
            out.push_str(&row.text);
        }
        let padding = if self.options.show_samples { " | | | |" } else { " |" };
        let _ = writeln!(
            out,
            "| **Total** |{padding} **{mean:.2}** | {} |",
            format_duration(round_duration(self.total_duration)),
        );
        out
    }

    /// Write the rendered table.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(self.render().as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// Cut `s` to `width` characters, marking the cut with an ellipsis.
#[must_use]
pub fn truncate(s: &str, width: usize) -> String {
    match s.char_indices().nth(width) {
        Some((idx, _)) => {
            let mut cut = s[..idx].to_string();
            cut.push(ELLIPSIS);
            cut
        }
        None => s.to_string(),
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(|c: char| c == '\n' || c == '\r', " ")
}
