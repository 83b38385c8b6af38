//! Live scrape of the soccer listing
//!
//! Usage:
//! ```
//! cargo run --example soccer_odds -- [target_url]
//! ```
//!
//! The browser window stays visible so a verification challenge can be
//! completed by hand; press Enter in this terminal afterwards.

use sportsbook_scraper::{
    ChromiumRenderer, ConsoleResolver, CsvSink, Orchestrator, RunStatus, ScraperConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = ScraperConfig::default()
        .with_headless(false)
        .with_page_source(true);
    if let Some(url) = std::env::args().nth(1) {
        config = config.with_target_url(url);
    }

    println!("=== Sportsbook Soccer Scraper ===");
    println!("Target: {}", config.target_url);
    println!("Window: {} days", config.window_days);
    println!();

    let renderer = ChromiumRenderer::new(&config);
    let sink = CsvSink::new(&config.output_dir);
    let mut orchestrator = Orchestrator::new(config, renderer, ConsoleResolver::new(), sink)?;

    let shutdown = orchestrator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shutdown();
        }
    });

    let report = orchestrator.run().await;

    println!();
    match report.status() {
        RunStatus::Extracted(n) => {
            println!("Found {} matches:", n);
            for r in &report.records {
                println!(
                    "  {} {:<8} {:<30} {} vs {}  [{} / {} / {}]",
                    r.date,
                    r.kickoff_time,
                    r.league,
                    r.home_team,
                    r.away_team,
                    r.home_odds,
                    r.draw_odds,
                    r.away_odds
                );
            }
            if let Some(path) = &report.output_path {
                println!("Data saved to {:?}", path);
            }
        }
        RunStatus::ExtractedUnsaved(n) => println!("Extracted {} matches but saving failed", n),
        RunStatus::NoRecords => println!("No matches found in the date window"),
        RunStatus::Cancelled => println!("Run cancelled"),
        RunStatus::Failed(stage) => println!("Scraping failed during {}", stage),
    }
    if let Some(failure) = &report.failure {
        eprintln!("Error: {}", failure.error);
    }

    Ok(())
}
