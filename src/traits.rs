use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::browser::DomPredicate;
use crate::error::ScraperError;
use crate::soccer::MatchRecord;

/// A controllable browser session that owns exactly one page.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Launch the browser session
    async fn start(&mut self) -> Result<(), ScraperError>;

    /// Load `url`, failing with `Navigation` once the configured budget runs out.
    async fn navigate(&self, url: &str) -> Result<(), ScraperError>;

    /// Poll the rendered DOM until `predicate` holds, or fail with `WaitTimeout`.
    async fn wait_until(
        &self,
        predicate: &DomPredicate,
        timeout: Duration,
    ) -> Result<(), ScraperError>;

    /// Point-in-time copy of the rendered document.
    async fn current_markup(&self) -> Result<String, ScraperError>;

    async fn run_script(&self, script: &str) -> Result<serde_json::Value, ScraperError>;

    /// Diagnostic image keyed by `label`. Failures are logged, never returned.
    async fn snapshot(&self, label: &str);

    /// Release the browser session
    async fn close(&mut self) -> Result<(), ScraperError>;
}

/// Out-of-band confirmation that a verification challenge has been dealt with.
#[async_trait]
pub trait ChallengeResolver: Send + Sync {
    async fn await_resolution(&self) -> Result<(), ScraperError>;
}

/// Row-oriented destination for the assembled dataset.
pub trait RecordSink: Send {
    /// Write all records, returning where they went.
    fn write(&mut self, records: &[MatchRecord]) -> Result<PathBuf, ScraperError>;
}
