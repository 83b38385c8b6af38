use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::DomPredicate;
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::Renderer;

/// Poll interval for bounded DOM waits (milliseconds)
const WAIT_POLL_INTERVAL_MS: u64 = 250;

/// Chrome session driven over the DevTools protocol.
pub struct ChromiumRenderer {
    headless: bool,
    debug: bool,
    user_agent: Option<String>,
    chrome_executable: Option<PathBuf>,
    navigation_timeout: Duration,
    snapshot_dir: Option<PathBuf>,
    user_data_dir: Option<PathBuf>,
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
}

impl ChromiumRenderer {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            headless: config.headless,
            debug: config.debug,
            user_agent: config.user_agent.clone(),
            chrome_executable: config.chrome_executable.clone(),
            navigation_timeout: config.navigation_timeout,
            snapshot_dir: config.snapshot_dir.clone(),
            user_data_dir: None,
            browser: None,
            page: None,
            handler: None,
        }
    }

    fn page(&self) -> Result<&Page, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("browser not started".into()))
    }

    /// Environment overrides the configured executable.
    fn chrome_path(&self) -> Option<PathBuf> {
        std::env::var("CHROME_PATH")
            .or_else(|_| std::env::var("CHROMIUM_PATH"))
            .map(PathBuf::from)
            .ok()
            .or_else(|| self.chrome_executable.clone())
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn start(&mut self) -> Result<(), ScraperError> {
        info!("Launching browser (headless={})...", self.headless);

        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("sportsbook-{}", unique_id));
        // Set before launch so close() removes it on every exit path.
        self.user_data_dir = Some(user_data_dir.clone());

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .window_size(1366, 900);

        if let Some(path) = self.chrome_path() {
            builder = builder.chrome_executable(path);
        }

        if !self.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .request_timeout(self.navigation_timeout)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if self.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder.build().map_err(ScraperError::BrowserInit)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        self.handler = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        }));
        let browser = self.browser.insert(browser);

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        if let Some(user_agent) = &self.user_agent {
            page.set_user_agent(user_agent.clone())
                .await
                .map_err(|e| ScraperError::BrowserInit(format!("user agent: {}", e)))?;
        }

        self.page = Some(page);

        info!("Browser ready");
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        let page = self.page()?;
        info!("Navigating to {}", url);

        match tokio::time::timeout(self.navigation_timeout, page.goto(url)).await {
            Ok(Ok(_)) => {
                info!("Page loaded: {}", url);
                Ok(())
            }
            Ok(Err(e)) => Err(ScraperError::Navigation(e.to_string())),
            Err(_) => Err(ScraperError::Navigation(format!(
                "{} did not load within {:?}",
                url, self.navigation_timeout
            ))),
        }
    }

    async fn wait_until(
        &self,
        predicate: &DomPredicate,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        let page = self.page()?;
        debug!("Waiting up to {:?} for {}", timeout, predicate.description());
        let start = Instant::now();

        loop {
            match page.evaluate(predicate.script()).await {
                Ok(result) => {
                    if result.into_value::<bool>().unwrap_or(false) {
                        debug!(
                            "{} satisfied after {:?}",
                            predicate.description(),
                            start.elapsed()
                        );
                        return Ok(());
                    }
                }
                Err(e) => debug!("Predicate check error: {}", e),
            }

            if start.elapsed() >= timeout {
                return Err(ScraperError::WaitTimeout(
                    predicate.description().to_string(),
                ));
            }

            sleep(Duration::from_millis(WAIT_POLL_INTERVAL_MS)).await;
        }
    }

    async fn current_markup(&self) -> Result<String, ScraperError> {
        self.page()?
            .content()
            .await
            .map_err(|e| ScraperError::JavaScript(format!("reading page content: {}", e)))
    }

    async fn run_script(&self, script: &str) -> Result<serde_json::Value, ScraperError> {
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn snapshot(&self, label: &str) {
        let Some(dir) = &self.snapshot_dir else {
            return;
        };
        let page = match self.page() {
            Ok(page) => page,
            Err(e) => {
                warn!("Snapshot '{}' skipped: {}", label, e);
                return;
            }
        };

        let png = match page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(png) => png,
            Err(e) => {
                warn!("Snapshot '{}' failed: {}", label, e);
                return;
            }
        };

        if self.debug {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
            debug!("Snapshot {}: data:image/png;base64,{}", label, encoded);
        }

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("Failed to create snapshot directory {:?}: {}", dir, e);
            return;
        }

        let path = dir.join(format!("{}.png", label));
        match tokio::fs::write(&path, &png).await {
            Ok(()) => info!("Snapshot saved to {:?}", path),
            Err(e) => warn!("Failed to write snapshot {:?}: {}", path, e),
        }
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        info!("Closing browser...");

        self.page = None;

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Browser close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser process wait failed: {}", e);
            }
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        if let Some(dir) = self.user_data_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                debug!("Failed to remove profile directory {:?}: {}", dir, e);
            }
        }

        info!("Browser closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_renderer_is_not_started() {
        let config = ScraperConfig::default().with_headless(false);
        let renderer = ChromiumRenderer::new(&config);
        assert!(renderer.browser.is_none());
        assert!(renderer.page.is_none());
        assert!(!renderer.headless);
        assert!(matches!(
            renderer.page(),
            Err(ScraperError::BrowserInit(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_without_session_is_silent() {
        let renderer = ChromiumRenderer::new(&ScraperConfig::default());
        renderer.snapshot("after_navigation").await;
    }

    #[tokio::test]
    async fn test_failed_launch_leaves_nothing_behind() {
        if std::env::var_os("CHROME_PATH").is_some() || std::env::var_os("CHROMIUM_PATH").is_some() {
            return;
        }
        let config = ScraperConfig::default()
            .with_chrome_executable("/nonexistent/sportsbook-test-chrome")
            .with_snapshot_dir(None);
        let mut renderer = ChromiumRenderer::new(&config);

        assert!(matches!(
            renderer.start().await,
            Err(ScraperError::BrowserInit(_))
        ));
        let profile = renderer.user_data_dir.clone().unwrap();

        renderer.close().await.unwrap();
        assert!(renderer.user_data_dir.is_none());
        assert!(renderer.handler.is_none());
        assert!(!profile.exists());
    }

    #[tokio::test]
    #[ignore] // Needs a local Chrome: cargo test test_render_live_page -- --ignored --nocapture
    async fn test_render_live_page() {
        let config = ScraperConfig::default()
            .with_snapshot_dir(None)
            .with_user_agent("sportsbook-scraper-test");
        let mut renderer = ChromiumRenderer::new(&config);
        renderer.start().await.expect("Failed to launch browser");
        renderer
            .navigate("data:text/html,<html><body><p>ok</p></body></html>")
            .await
            .expect("navigation");
        renderer
            .wait_until(&DomPredicate::body_present(), Duration::from_secs(5))
            .await
            .expect("body");
        let markup = renderer.current_markup().await.expect("markup");
        assert!(markup.contains("<p>ok</p>"));
        let agent = renderer.run_script("navigator.userAgent").await.expect("agent");
        assert_eq!(agent.as_str(), Some("sportsbook-scraper-test"));
        renderer.close().await.expect("close");
    }
}
