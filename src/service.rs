use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::browser::ChromiumRenderer;
use crate::challenge::ConsoleResolver;
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::orchestrator::{Orchestrator, RunReport};
use crate::output::CsvSink;

/// Scrape request
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub target_url: String,
    pub window_days: u32,
    pub output_dir: PathBuf,
    pub headless: bool,
}

impl ScrapeRequest {
    pub fn new(target_url: impl Into<String>) -> Self {
        let defaults = ScraperConfig::default();
        Self {
            target_url: target_url.into(),
            window_days: defaults.window_days,
            output_dir: defaults.output_dir,
            headless: defaults.headless,
        }
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

impl From<ScrapeRequest> for ScraperConfig {
    fn from(req: ScrapeRequest) -> Self {
        ScraperConfig::new(req.target_url)
            .with_window_days(req.window_days)
            .with_output_dir(req.output_dir)
            .with_headless(req.headless)
    }
}

/// tower::Service over a full Chrome-backed run. Challenges are resolved by
/// an operator at the console, so requests should not be headless when a
/// challenge is expected.
#[derive(Debug, Clone, Default)]
pub struct ScraperService {
    base: Option<ScraperConfig>,
}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for every setting a request does not carry.
    pub fn with_base_config(config: ScraperConfig) -> Self {
        Self { base: Some(config) }
    }

    fn config_for(&self, req: ScrapeRequest) -> ScraperConfig {
        match &self.base {
            Some(base) => base
                .clone()
                .with_window_days(req.window_days)
                .with_output_dir(req.output_dir)
                .with_headless(req.headless)
                .with_target_url(req.target_url),
            None => req.into(),
        }
    }
}

impl Service<ScrapeRequest> for ScraperService {
    type Response = RunReport;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!("Scrape request received: url={}", req.target_url);
        let config = self.config_for(req);

        Box::pin(async move {
            let renderer = ChromiumRenderer::new(&config);
            let sink = CsvSink::new(&config.output_dir);
            let mut orchestrator =
                Orchestrator::new(config, renderer, ConsoleResolver::new(), sink)?;

            let report = orchestrator.run().await;

            info!(
                "Scrape finished: status={:?}, output={:?}",
                report.status(),
                report.output_path
            );

            Ok(report)
        })
    }
}
