//! evalscope command line
//!
//! Reads eval test output, prints a markdown trend report on stdout and
//! records the scores in a SQLite history database.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use evalscope::history::SqliteScoreStore;
use evalscope::notify::{Notifier, DEFAULT_URL, SECRET_KEY_VAR};
use evalscope::pipeline::{InputFormat, Pipeline};
use evalscope::report::ReportOptions;
use evalscope::tracker::{ScoreTracker, DEFAULT_TOLERANCE};

#[derive(Parser)]
#[command(name = "evalscope", version, about = "Track eval scores from test output")]
struct Cli {
    /// Input file path, `-` for stdin
    #[arg(short, long, default_value = "evals.jsonl")]
    input: String,
    /// Experiment label (default: current time, RFC 3339)
    #[arg(short, long)]
    experiment: Option<String>,
    /// Database file path, created if it does not exist
    #[arg(long, default_value = "evals.db")]
    db: PathBuf,
    /// Branch name sent with uploaded results
    #[arg(long, default_value = "main")]
    branch: String,
    /// Input format: test-json or eval-jsonl (default: eval-jsonl for
    /// `.jsonl` files, test-json otherwise)
    #[arg(long)]
    format: Option<InputFormat>,
    /// Score changes smaller than this are reported as unchanged
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,
    /// Show truncated input, expected and output columns
    #[arg(long)]
    samples: bool,
    /// Upload endpoint used when the secret key is set
    #[arg(long, default_value = DEFAULT_URL)]
    notify_url: String,
    /// Bearer token enabling the upload
    #[arg(long, env = SECRET_KEY_VAR, hide_env_values = true)]
    secret_key: Option<String>,
    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let experiment = cli
        .experiment
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    info!(experiment = experiment.as_str(), db = %cli.db.display(), "starting ingestion");

    let mut store = SqliteScoreStore::open(&cli.db)
        .with_context(|| format!("opening database {}", cli.db.display()))?;
    store.begin().context("starting transaction")?;

    let options = ReportOptions {
        show_samples: cli.samples,
        ..ReportOptions::default()
    };
    let tracker = ScoreTracker::new(&mut store, experiment)
        .with_tolerance(cli.tolerance)?
        .with_report_options(options);
    let format = cli
        .format
        .unwrap_or_else(|| InputFormat::for_path(&cli.input));
    let mut pipeline = Pipeline::new(tracker).with_format(format);

    let result = if cli.input == "-" {
        pipeline.run(io::stdin().lock())
    } else {
        let file = File::open(&cli.input)
            .with_context(|| format!("opening input file {}", cli.input))?;
        pipeline.run(BufReader::new(file))
    };
    let outcome = pipeline.finish();

    // Keep what was tracked before a failure, like an unbatched run would.
    if let Err(e) = result {
        if let Err(commit_err) = store.commit() {
            warn!(error = %commit_err, "scores tracked before the failure were not saved");
        }
        return Err(anyhow::Error::new(e).context("ingesting eval results"));
    }
    store.commit().context("committing scores")?;

    outcome.report.write_to(io::stdout().lock())?;

    let summary = outcome.report.summary();
    info!(
        results = summary.count,
        mean_score = summary.mean_score,
        "report written"
    );

    if summary.count > 0 {
        if let Some(secret) = cli.secret_key {
            let sent = Notifier::new(cli.notify_url, secret, cli.branch)
                .and_then(|notifier| notifier.send(&outcome.records));
            if let Err(e) = sent {
                warn!(error = %e, "eval results were not uploaded");
            }
        }
    }
    Ok(())
}
