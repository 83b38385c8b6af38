//! Sportsbook soccer scraper
//!
//! - Loads a JavaScript-rendered soccer listing in Chrome
//! - Waits for an operator (or any [`ChallengeResolver`]) when a verification challenge appears
//! - Extracts upcoming matches and 1X2 odds for the next few days into CSV
//!
//! # Service example
//!
//! ```rust,ignore
//! use sportsbook_scraper::{ScrapeRequest, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!
//!     let request = ScrapeRequest::new("https://stake.com/sports/soccer")
//!         .with_output_dir("./output")
//!         .with_headless(false);
//!
//!     let report = service.call(request).await.unwrap();
//!     println!("{:?} -> {:?}", report.status(), report.output_path);
//! }
//! ```
//!
//! # Orchestrator example
//!
//! ```rust,ignore
//! use sportsbook_scraper::{ChromiumRenderer, CsvSink, Orchestrator, ScraperConfig, SignalResolver};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::default().with_window_days(3);
//!     let (resolver, signal) = SignalResolver::new();
//!     // hand `signal` to whatever learns that the challenge was cleared
//!
//!     let mut orchestrator = Orchestrator::new(
//!         config.clone(),
//!         ChromiumRenderer::new(&config),
//!         resolver,
//!         CsvSink::new(&config.output_dir),
//!     )
//!     .unwrap();
//!     let report = orchestrator.run().await;
//!     println!("{:?}", report.status());
//! }
//! ```

pub mod browser;
pub mod challenge;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod service;
pub mod soccer;
pub mod traits;

pub use browser::{ChromiumRenderer, DomPredicate};
pub use challenge::{ChallengeGate, ChallengeSignal, ConsoleResolver, GateOutcome, SignalResolver};
pub use config::{ScraperConfig, SelectorConfig};
pub use error::{ExtractionFailure, ScraperError};
pub use orchestrator::{Orchestrator, RunFailure, RunReport, RunStage, RunStatus, ShutdownHandle};
pub use output::{CsvSink, RecordAssembler};
pub use service::{ScrapeRequest, ScraperService};
pub use traits::{ChallengeResolver, RecordSink, Renderer};

pub use soccer::{DateWindow, MatchExtractor, MatchRecord, SectionHeader, SectionWalker};
