//! Run sequencing: startup, navigation, challenge gate, section walk, assembly, teardown

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::browser::{js_literal, DomPredicate};
use crate::challenge::ChallengeGate;
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::output::RecordAssembler;
use crate::soccer::{DateWindow, MatchRecord, SectionWalker, SelectorSet};
use crate::traits::{ChallengeResolver, RecordSink, Renderer};

/// Where in the run a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Startup,
    Navigation,
    Challenge,
    Walk,
    Sink,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Startup => "startup",
            RunStage::Navigation => "navigation",
            RunStage::Challenge => "challenge",
            RunStage::Walk => "walk",
            RunStage::Sink => "sink",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct RunFailure {
    pub stage: RunStage,
    pub error: ScraperError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Extracted(usize),
    /// Records were extracted but the sink rejected them.
    ExtractedUnsaved(usize),
    NoRecords,
    Failed(RunStage),
    Cancelled,
}

/// Outcome of one run. Never a panic: failures are carried here.
#[derive(Debug)]
pub struct RunReport {
    pub records: Vec<MatchRecord>,
    pub output_path: Option<PathBuf>,
    pub failure: Option<RunFailure>,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        match &self.failure {
            Some(RunFailure {
                error: ScraperError::Cancelled,
                ..
            }) => RunStatus::Cancelled,
            Some(RunFailure {
                stage: RunStage::Sink,
                ..
            }) => RunStatus::ExtractedUnsaved(self.records.len()),
            Some(failure) => RunStatus::Failed(failure.stage),
            None if self.records.is_empty() => RunStatus::NoRecords,
            None => RunStatus::Extracted(self.records.len()),
        }
    }
}

/// Stops a running [`Orchestrator`] at its next suspension point.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

pub struct Orchestrator<R, C, S> {
    config: ScraperConfig,
    selectors: SelectorSet,
    renderer: R,
    resolver: C,
    sink: S,
    stage: RunStage,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<R, C, S> Orchestrator<R, C, S>
where
    R: Renderer,
    C: ChallengeResolver,
    S: RecordSink,
{
    /// Fails only if a selector rule in `config` does not compile.
    pub fn new(config: ScraperConfig, renderer: R, resolver: C, sink: S) -> Result<Self, ScraperError> {
        let selectors = SelectorSet::compile(&config.selectors)?;
        let (tx, rx) = watch::channel(false);
        Ok(Self {
            config,
            selectors,
            renderer,
            resolver,
            sink,
            stage: RunStage::Startup,
            shutdown_tx: Arc::new(tx),
            shutdown_rx: rx,
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    pub async fn run(&mut self) -> RunReport {
        self.run_on(Local::now().date_naive()).await
    }

    /// Full run with the date window anchored at `today`.
    ///
    /// A shutdown requested before or during the run cancels only this run.
    pub async fn run_on(&mut self, today: NaiveDate) -> RunReport {
        let window = DateWindow::starting(today, self.config.window_days);
        let mut shutdown = self.shutdown_rx.clone();
        self.stage = RunStage::Startup;

        let extracted = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => Err(ScraperError::Cancelled),
            result = self.pipeline(window) => result,
        };
        self.shutdown_tx.send_replace(false);

        self.renderer.snapshot("final_state").await;
        if let Err(e) = self.renderer.close().await {
            warn!("Renderer teardown failed: {}", e);
        }

        let report = match extracted {
            Ok(records) if records.is_empty() => RunReport {
                records,
                output_path: None,
                failure: None,
            },
            Ok(records) => {
                let mut assembler = RecordAssembler::new();
                assembler.extend(records);
                let (records, written) = assembler.hand_off(&mut self.sink);
                match written {
                    Ok(path) => RunReport {
                        records,
                        output_path: Some(path),
                        failure: None,
                    },
                    Err(error) => RunReport {
                        records,
                        output_path: None,
                        failure: Some(RunFailure {
                            stage: RunStage::Sink,
                            error,
                        }),
                    },
                }
            }
            Err(error) => RunReport {
                records: Vec::new(),
                output_path: None,
                failure: Some(RunFailure {
                    stage: self.stage,
                    error,
                }),
            },
        };

        match (report.status(), &report.failure) {
            (RunStatus::Extracted(n), _) => info!("Run completed: {} matches", n),
            (RunStatus::NoRecords, _) => info!("Run completed: no matches found"),
            (RunStatus::Cancelled, _) => warn!("Run cancelled during {}", self.stage),
            (_, Some(failure)) => error!(
                "Run failed at {} ({} matches extracted): {}",
                failure.stage,
                report.records.len(),
                failure.error
            ),
            _ => {}
        }

        report
    }

    async fn pipeline(&mut self, window: DateWindow) -> Result<Vec<MatchRecord>, ScraperError> {
        self.stage = RunStage::Startup;
        self.renderer.start().await?;

        self.stage = RunStage::Navigation;
        self.renderer.navigate(&self.config.target_url).await?;
        sleep(self.config.challenge_settle).await;

        self.stage = RunStage::Challenge;
        let gate = ChallengeGate::new(&self.selectors.challenge_markers, self.config.ready_timeout);
        gate.check(&self.renderer, &self.resolver).await?;

        self.stage = RunStage::Navigation;
        self.renderer
            .wait_until(&DomPredicate::body_present(), self.config.ready_timeout)
            .await?;
        self.renderer.snapshot("after_navigation").await;

        self.stage = RunStage::Walk;
        if let Some(label) = &self.config.upcoming_tab {
            self.open_tab(label).await?;
        }

        self.renderer
            .wait_until(
                &DomPredicate::any_selector_present(&self.config.selectors.sections),
                self.config.section_timeout,
            )
            .await?;

        let walker = SectionWalker::new(&self.selectors, window);
        walker
            .trigger_lazy_load(
                &self.renderer,
                self.config.scroll_passes,
                self.config.lazy_load_delay,
            )
            .await;

        let markup = self.renderer.current_markup().await?;
        if self.config.save_page_source {
            self.save_page_source(&markup).await;
        }

        Ok(walker.walk(&markup))
    }

    async fn open_tab(&self, label: &str) -> Result<(), ScraperError> {
        info!("Opening '{}' tab", label);
        self.renderer
            .wait_until(
                &DomPredicate::button_with_text(label),
                self.config.section_timeout,
            )
            .await?;

        let script = format!(
            "(() => {{ const b = Array.from(document.querySelectorAll('button')).find(b => (b.textContent || '').includes({})); if (!b) return false; b.click(); return true; }})()",
            js_literal(label)
        );
        let clicked = self.renderer.run_script(&script).await?;
        if clicked.as_bool() != Some(true) {
            warn!("'{}' tab disappeared before it could be clicked", label);
        }

        sleep(self.config.lazy_load_delay).await;
        Ok(())
    }

    async fn save_page_source(&self, markup: &str) {
        let Some(dir) = &self.config.snapshot_dir else {
            return;
        };
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("Failed to create snapshot directory {:?}: {}", dir, e);
            return;
        }
        let path = dir.join("page_source.html");
        match tokio::fs::write(&path, markup).await {
            Ok(()) => info!("Saved page source to {:?}", path),
            Err(e) => warn!("Failed to save page source {:?}: {}", path, e),
        }
    }
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    let sender_gone = rx.wait_for(|stop| *stop).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::SignalResolver;
    use crate::soccer::fixtures::{listing, match_fragment, section, today};
    use crate::soccer::NO_ODDS;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Script {
        challenge: Option<String>,
        listing: String,
        fail_navigation: bool,
        missing: Vec<String>,
    }

    /// In-memory renderer that records every call.
    struct FakeRenderer {
        script: Script,
        markup_reads: Mutex<usize>,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl FakeRenderer {
        fn new(script: Script) -> (Self, Arc<Mutex<Vec<String>>>) {
            let events = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    script,
                    markup_reads: Mutex::new(0),
                    events: events.clone(),
                },
                events,
            )
        }

        fn log(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn start(&mut self) -> Result<(), ScraperError> {
            self.log("start");
            Ok(())
        }

        async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
            self.log(format!("navigate {}", url));
            if self.script.fail_navigation {
                return Err(ScraperError::Navigation(format!("{} timed out", url)));
            }
            Ok(())
        }

        async fn wait_until(
            &self,
            predicate: &DomPredicate,
            _timeout: Duration,
        ) -> Result<(), ScraperError> {
            if self
                .script
                .missing
                .iter()
                .any(|m| predicate.description().contains(m.as_str()))
            {
                return Err(ScraperError::WaitTimeout(predicate.description().to_string()));
            }
            Ok(())
        }

        async fn current_markup(&self) -> Result<String, ScraperError> {
            let mut reads = self.markup_reads.lock().unwrap();
            *reads += 1;
            self.log("markup");
            match (&self.script.challenge, *reads) {
                (Some(challenge), 1) => Ok(challenge.clone()),
                _ => Ok(self.script.listing.clone()),
            }
        }

        async fn run_script(&self, script: &str) -> Result<serde_json::Value, ScraperError> {
            if script.contains(".click()") {
                self.log("click");
                return Ok(serde_json::Value::Bool(true));
            }
            Ok(serde_json::Value::Null)
        }

        async fn snapshot(&self, label: &str) {
            self.log(format!("snapshot {}", label));
        }

        async fn close(&mut self) -> Result<(), ScraperError> {
            self.log("close");
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        written: Arc<Mutex<Vec<MatchRecord>>>,
        fail: bool,
    }

    impl RecordSink for MemorySink {
        fn write(&mut self, records: &[MatchRecord]) -> Result<PathBuf, ScraperError> {
            if self.fail {
                return Err(ScraperError::SinkWrite("disk full".into()));
            }
            self.written.lock().unwrap().extend_from_slice(records);
            Ok(PathBuf::from("memory.csv"))
        }
    }

    fn config() -> ScraperConfig {
        ScraperConfig::new("https://sportsbook.test/sports/soccer")
            .with_challenge_settle(Duration::ZERO)
            .with_lazy_load_delay(Duration::ZERO)
            .with_upcoming_tab(None)
            .with_snapshot_dir(None)
    }

    fn two_section_listing() -> String {
        listing(&[
            section(
                "Today",
                &[
                    match_fragment("Arsenal", "Chelsea", &["1.85", "3.60", "4.20"]),
                    match_fragment("Roma", "Lazio", &["2.10", "3.30"]),
                ],
            ),
            section("In 5 days", &[match_fragment("Ajax", "PSV", &["1.5", "4.0", "6.0"])]),
        ])
    }

    fn events(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_end_to_end_extracts_today_only() {
        let (renderer, log) = FakeRenderer::new(Script {
            listing: two_section_listing(),
            ..Default::default()
        });
        let (resolver, _signal) = SignalResolver::new();
        let sink = MemorySink::default();
        let written = sink.written.clone();

        let mut orchestrator = Orchestrator::new(config(), renderer, resolver, sink).unwrap();
        let report = orchestrator.run_on(today()).await;

        assert_eq!(report.status(), RunStatus::Extracted(2));
        assert_eq!(report.output_path, Some(PathBuf::from("memory.csv")));
        assert!(report.records.iter().all(|r| r.date == today()));
        assert_eq!(report.records[0].home_team, "Arsenal");
        assert_eq!(report.records[1].home_team, "Roma");
        assert_eq!(report.records[1].home_odds, NO_ODDS);
        assert_eq!(*written.lock().unwrap(), report.records);

        let events = events(&log);
        assert_eq!(events[0], "start");
        assert_eq!(events[1], "navigate https://sportsbook.test/sports/soccer");
        assert!(events.contains(&"snapshot after_navigation".to_string()));
        assert_eq!(
            &events[events.len() - 2..],
            &["snapshot final_state".to_string(), "close".to_string()]
        );
    }

    #[tokio::test]
    async fn test_navigation_failure_still_tears_down() {
        let (renderer, log) = FakeRenderer::new(Script {
            fail_navigation: true,
            ..Default::default()
        });
        let (resolver, _signal) = SignalResolver::new();
        let sink = MemorySink::default();
        let written = sink.written.clone();

        let mut orchestrator = Orchestrator::new(config(), renderer, resolver, sink).unwrap();
        let report = orchestrator.run_on(today()).await;

        assert_eq!(report.status(), RunStatus::Failed(RunStage::Navigation));
        assert!(matches!(
            report.failure.as_ref().map(|f| &f.error),
            Some(ScraperError::Navigation(_))
        ));
        assert!(written.lock().unwrap().is_empty());
        let events = events(&log);
        assert!(!events.contains(&"markup".to_string()));
        assert!(events.ends_with(&["snapshot final_state".to_string(), "close".to_string()]));
    }

    #[tokio::test]
    async fn test_empty_listing_is_reported_distinctly() {
        let (renderer, _log) = FakeRenderer::new(Script {
            listing: listing(&[section("Today", &[])]),
            ..Default::default()
        });
        let (resolver, _signal) = SignalResolver::new();
        let sink = MemorySink::default();
        let written = sink.written.clone();

        let mut orchestrator = Orchestrator::new(config(), renderer, resolver, sink).unwrap();
        let report = orchestrator.run_on(today()).await;

        assert_eq!(report.status(), RunStatus::NoRecords);
        assert!(report.output_path.is_none());
        assert!(written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_sections_fail_the_walk() {
        let (renderer, log) = FakeRenderer::new(Script {
            listing: two_section_listing(),
            missing: vec!["div.sports-group".to_string()],
            ..Default::default()
        });
        let (resolver, _signal) = SignalResolver::new();

        let mut orchestrator =
            Orchestrator::new(config(), renderer, resolver, MemorySink::default()).unwrap();
        let report = orchestrator.run_on(today()).await;

        assert_eq!(report.status(), RunStatus::Failed(RunStage::Walk));
        assert!(report.failure.unwrap().error.is_timeout());
        assert!(events(&log).contains(&"close".to_string()));
    }

    #[tokio::test]
    async fn test_sink_failure_keeps_counts() {
        let (renderer, _log) = FakeRenderer::new(Script {
            listing: two_section_listing(),
            ..Default::default()
        });
        let (resolver, _signal) = SignalResolver::new();
        let sink = MemorySink {
            fail: true,
            ..Default::default()
        };

        let mut orchestrator = Orchestrator::new(config(), renderer, resolver, sink).unwrap();
        let report = orchestrator.run_on(today()).await;

        assert_eq!(report.status(), RunStatus::ExtractedUnsaved(2));
        assert_eq!(report.records.len(), 2);
    }

    #[tokio::test]
    async fn test_upcoming_tab_is_clicked() {
        let (renderer, log) = FakeRenderer::new(Script {
            listing: two_section_listing(),
            ..Default::default()
        });
        let (resolver, _signal) = SignalResolver::new();
        let config = config().with_upcoming_tab(Some("Upcoming".to_string()));

        let mut orchestrator =
            Orchestrator::new(config, renderer, resolver, MemorySink::default()).unwrap();
        let report = orchestrator.run_on(today()).await;

        assert_eq!(report.status(), RunStatus::Extracted(2));
        assert!(events(&log).contains(&"click".to_string()));
    }

    #[tokio::test]
    async fn test_challenge_suspends_until_resolved() {
        let (renderer, log) = FakeRenderer::new(Script {
            challenge: Some(
                r#"<html><body><iframe src="https://captcha.test/frame"></iframe></body></html>"#
                    .to_string(),
            ),
            listing: two_section_listing(),
            ..Default::default()
        });
        let (resolver, signal) = SignalResolver::new();

        let mut orchestrator =
            Orchestrator::new(config(), renderer, resolver, MemorySink::default()).unwrap();
        let run = tokio::spawn(async move { orchestrator.run_on(today()).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let suspended = events(&log);
        assert_eq!(
            suspended.iter().filter(|e| e.as_str() == "markup").count(),
            1
        );
        assert!(!suspended.contains(&"snapshot after_navigation".to_string()));

        signal.resolved();
        let report = run.await.unwrap();
        assert_eq!(report.status(), RunStatus::Extracted(2));
        assert_eq!(
            events(&log).iter().filter(|e| e.as_str() == "markup").count(),
            2
        );
    }

    #[tokio::test]
    async fn test_shutdown_cancels_suspended_run() {
        let (renderer, log) = FakeRenderer::new(Script {
            challenge: Some(
                r#"<html><body><iframe src="https://www.recaptcha.test/anchor"></iframe></body></html>"#
                    .to_string(),
            ),
            listing: two_section_listing(),
            ..Default::default()
        });
        let (resolver, _signal) = SignalResolver::new();

        let mut orchestrator =
            Orchestrator::new(config(), renderer, resolver, MemorySink::default()).unwrap();
        let shutdown = orchestrator.shutdown_handle();
        let run = tokio::spawn(async move { orchestrator.run_on(today()).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.shutdown();
        let report = run.await.unwrap();

        assert_eq!(report.status(), RunStatus::Cancelled);
        assert_eq!(report.failure.unwrap().stage, RunStage::Challenge);
        assert!(events(&log).ends_with(&["snapshot final_state".to_string(), "close".to_string()]));
    }

    #[tokio::test]
    async fn test_shutdown_does_not_outlive_the_run() {
        let (renderer, log) = FakeRenderer::new(Script {
            listing: two_section_listing(),
            ..Default::default()
        });
        let (resolver, _signal) = SignalResolver::new();

        let mut orchestrator =
            Orchestrator::new(config(), renderer, resolver, MemorySink::default()).unwrap();
        orchestrator.shutdown_handle().shutdown();

        let cancelled = orchestrator.run_on(today()).await;
        assert_eq!(cancelled.status(), RunStatus::Cancelled);
        assert_eq!(cancelled.failure.unwrap().stage, RunStage::Startup);
        assert!(!events(&log).contains(&"start".to_string()));

        let next = orchestrator.run_on(today()).await;
        assert_eq!(next.status(), RunStatus::Extracted(2));
    }

    #[test]
    fn test_invalid_selector_rejected_at_construction() {
        let (renderer, _log) = FakeRenderer::new(Script::default());
        let (resolver, _signal) = SignalResolver::new();
        let mut config = config();
        config.selectors.teams = vec!["div[".to_string()];

        let result = Orchestrator::new(config, renderer, resolver, MemorySink::default());
        assert!(matches!(result, Err(ScraperError::InvalidSelector { .. })));
    }
}
