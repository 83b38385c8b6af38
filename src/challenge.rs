//! Human-verification gating
//!
//! The gate only detects a challenge and waits for someone else to clear it;
//! it never interacts with the challenge itself.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::browser::DomPredicate;
use crate::error::ScraperError;
use crate::soccer::{Cardinality, RuleList};
use crate::traits::{ChallengeResolver, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// No challenge in the rendered markup
    Clear,
    /// A challenge was present and has been resolved externally
    Resolved,
}

pub struct ChallengeGate<'s> {
    markers: &'s RuleList,
    ready_timeout: Duration,
}

impl<'s> ChallengeGate<'s> {
    pub fn new(markers: &'s RuleList, ready_timeout: Duration) -> Self {
        Self {
            markers,
            ready_timeout,
        }
    }

    pub fn detect(&self, markup: &str) -> bool {
        if self.markers.is_empty() {
            return false;
        }
        let document = Html::parse_document(markup);
        self.markers
            .select_in_document(&document, Cardinality::AtLeast(1))
            .is_some()
    }

    /// Checks the current page once. If a challenge is present, blocks until
    /// `resolver` confirms, then re-checks basic readiness.
    pub async fn check<R, C>(&self, renderer: &R, resolver: &C) -> Result<GateOutcome, ScraperError>
    where
        R: Renderer + ?Sized,
        C: ChallengeResolver + ?Sized,
    {
        let markup = renderer.current_markup().await?;
        if !self.detect(&markup) {
            info!("No verification challenge detected");
            return Ok(GateOutcome::Clear);
        }

        warn!("Verification challenge detected, waiting for resolution...");
        resolver.await_resolution().await?;

        renderer
            .wait_until(&DomPredicate::body_present(), self.ready_timeout)
            .await
            .map_err(|e| ScraperError::ChallengeVerificationFailed(e.to_string()))?;

        info!("Challenge resolved, continuing");
        Ok(GateOutcome::Resolved)
    }
}

/// Waits for an operator to press Enter on stdin.
#[derive(Debug, Clone, Default)]
pub struct ConsoleResolver;

impl ConsoleResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChallengeResolver for ConsoleResolver {
    async fn await_resolution(&self) -> Result<(), ScraperError> {
        // The operator may run with logging filtered, so the prompt goes to stderr.
        eprintln!();
        eprintln!("{}", "=".repeat(50));
        eprintln!("MANUAL VERIFICATION REQUIRED");
        eprintln!("1. Complete the verification shown in the browser window");
        eprintln!("2. Return here and press Enter to continue");
        eprintln!("{}", "=".repeat(50));

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;
        if read == 0 {
            return Err(ScraperError::ChallengeUnresolved(
                "operator input closed".into(),
            ));
        }

        info!("Operator confirmed challenge resolution");
        Ok(())
    }
}

/// Resolver driven by a [`ChallengeSignal`] from elsewhere in the process
/// (a webhook handler, another task).
#[derive(Debug, Clone)]
pub struct SignalResolver {
    rx: watch::Receiver<bool>,
}

/// Sending half of a [`SignalResolver`].
#[derive(Debug)]
pub struct ChallengeSignal {
    tx: watch::Sender<bool>,
}

impl SignalResolver {
    pub fn new() -> (Self, ChallengeSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { rx }, ChallengeSignal { tx })
    }
}

impl ChallengeSignal {
    pub fn resolved(&self) {
        self.tx.send_replace(true);
    }
}

#[async_trait]
impl ChallengeResolver for SignalResolver {
    async fn await_resolution(&self) -> Result<(), ScraperError> {
        let mut rx = self.rx.clone();
        rx.wait_for(|resolved| *resolved)
            .await
            .map(|_| ())
            .map_err(|_| ScraperError::ChallengeUnresolved("signal dropped".into()))
    }
}
