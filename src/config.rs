use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TARGET_URL: &str = "https://stake.com/sports/soccer";

/// Ordered CSS rule lists, one list per field category.
///
/// Earlier rules win: the extractor stops at the first rule whose match count
/// has the cardinality the category expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    pub sections: Vec<String>,
    pub section_headers: Vec<String>,
    pub matches: Vec<String>,
    pub teams: Vec<String>,
    pub odds: Vec<String>,
    pub kickoff_time: Vec<String>,
    pub league: Vec<String>,
    pub challenge_markers: Vec<String>,
}

fn rules(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            sections: rules(&["div.sports-group"]),
            section_headers: rules(&["div.sports-group-header"]),
            matches: rules(&["div.sports-event"]),
            teams: rules(&["div.team-name", "div.participant-name", "div.team"]),
            odds: rules(&["button.odds-button", "button.price", "button.odd-button"]),
            kickoff_time: rules(&["div.event-time"]),
            league: rules(&[
                "div.sports-tournament-header",
                "div.league-name",
                "div.tournament-header",
            ]),
            challenge_markers: rules(&[
                "iframe[src*='captcha']",
                "iframe[src*='recaptcha']",
                "iframe[src*='challenge']",
            ]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub target_url: String,
    /// Number of consecutive days, starting today, whose sections are kept.
    pub window_days: u32,
    pub selectors: SelectorConfig,
    pub navigation_timeout: Duration,
    pub ready_timeout: Duration,
    pub section_timeout: Duration,
    /// Pause after navigation so a challenge frame has time to appear.
    pub challenge_settle: Duration,
    pub lazy_load_delay: Duration,
    pub scroll_passes: u32,
    /// Label of the tab to activate before reading sections.
    pub upcoming_tab: Option<String>,
    pub headless: bool,
    pub debug: bool,
    pub user_agent: Option<String>,
    pub chrome_executable: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub snapshot_dir: Option<PathBuf>,
    pub save_page_source: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            window_days: 4,
            selectors: SelectorConfig::default(),
            navigation_timeout: Duration::from_secs(60),
            ready_timeout: Duration::from_secs(30),
            section_timeout: Duration::from_secs(20),
            challenge_settle: Duration::from_secs(5),
            lazy_load_delay: Duration::from_secs(1),
            scroll_passes: 0,
            upcoming_tab: Some("Upcoming".to_string()),
            headless: true,
            debug: false,
            user_agent: None,
            chrome_executable: None,
            output_dir: PathBuf::from("./output"),
            snapshot_dir: Some(PathBuf::from("./snapshots")),
            save_page_source: false,
        }
    }
}

impl ScraperConfig {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Default::default()
        }
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = url.into();
        self
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    pub fn with_selectors(mut self, selectors: SelectorConfig) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_section_timeout(mut self, timeout: Duration) -> Self {
        self.section_timeout = timeout;
        self
    }

    pub fn with_challenge_settle(mut self, settle: Duration) -> Self {
        self.challenge_settle = settle;
        self
    }

    pub fn with_lazy_load_delay(mut self, delay: Duration) -> Self {
        self.lazy_load_delay = delay;
        self
    }

    pub fn with_scroll_passes(mut self, passes: u32) -> Self {
        self.scroll_passes = passes;
        self
    }

    pub fn with_upcoming_tab(mut self, label: Option<String>) -> Self {
        self.upcoming_tab = label;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_snapshot_dir(mut self, path: Option<PathBuf>) -> Self {
        self.snapshot_dir = path;
        self
    }

    pub fn with_page_source(mut self, save: bool) -> Self {
        self.save_page_source = save;
        self
    }
}
