//! Best-effort upload of a run's records.
//!
//! Failures are retried a bounded number of times and then given up on;
//! they never affect the outcome of the run.

use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{info, warn};

use crate::eval::EvalRecord;
use crate::{Error, Result};

/// Default upload endpoint.
pub const DEFAULT_URL: &str = "https://api.evals.fun/evals";
/// Environment variable holding the bearer token.
pub const SECRET_KEY_VAR: &str = "EVALSCOPE_SECRET_KEY";
/// Attempts before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 10;
/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NotifyRequest<'a> {
    branch: &'a str,
    evals: &'a [EvalRecord],
}

/// Posts ingested records to a remote endpoint.
pub struct Notifier {
    client: Client,
    url: String,
    secret: String,
    branch: String,
    attempts: u32,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("url", &self.url)
            .field("secret", &"<redacted>")
            .field("branch", &self.branch)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// Create a notifier with the default timeout and attempt count.
    ///
    /// # Errors
    ///
    /// Returns `Error::Notify` if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        secret: impl Into<String>,
        branch: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Notify(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            secret: secret.into(),
            branch: branch.into(),
            attempts: DEFAULT_ATTEMPTS,
        })
    }

    /// Set the number of attempts, at least one.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Request body for `records`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Notify` if the records cannot be serialized.
    pub fn request_body(&self, records: &[EvalRecord]) -> Result<serde_json::Value> {
        serde_json::to_value(NotifyRequest {
            branch: &self.branch,
            evals: records,
        })
        .map_err(|e| Error::Notify(format!("encoding request: {e}")))
    }

    /// Upload `records`, retrying on failure.
    ///
    /// # Errors
    ///
    /// Returns `Error::Notify` once every attempt has failed.
    pub fn send(&self, records: &[EvalRecord]) -> Result<()> {
        let body = self.request_body(records)?;
        for attempt in 1..=self.attempts {
            match self.try_send(&body) {
                Ok(()) => {
                    info!(url = self.url.as_str(), records = records.len(), "uploaded eval results");
                    return Ok(());
                }
                Err(e) => warn!(attempt, error = %e, "uploading eval results failed"),
            }
        }
        Err(Error::Notify(format!(
            "giving up after {} attempts",
            self.attempts
        )))
    }

    fn try_send(&self, body: &serde_json::Value) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.secret)
            .json(body)
            .send()
            .map_err(|e| Error::Notify(e.to_string()))?;
        if response.status() != StatusCode::CREATED {
            return Err(Error::Notify(format!(
                "unexpected status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
