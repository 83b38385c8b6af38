//! Soccer listing data types

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::ExtractionFailure;

/// Placeholder for a missing kickoff time or league.
pub const UNKNOWN: &str = "unknown";
/// Placeholder for odds when no rule yields three prices.
pub const NO_ODDS: &str = "N/A";

/// One upcoming match with its 1X2 prices.
///
/// Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub kickoff_time: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub home_odds: String,
    pub draw_odds: String,
    pub away_odds: String,
}

impl MatchRecord {
    pub const CSV_HEADERS: [&'static str; 8] = [
        "date",
        "kickoff_time",
        "league",
        "home_team",
        "away_team",
        "home_odds",
        "draw_odds",
        "away_odds",
    ];

    /// Both team names must be non-empty; everything else starts as a placeholder.
    pub fn new(
        date: NaiveDate,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Result<Self, ExtractionFailure> {
        let home_team = home_team.into();
        let away_team = away_team.into();
        if home_team.trim().is_empty() || away_team.trim().is_empty() {
            return Err(ExtractionFailure::BlankTeamName {
                home: home_team,
                away: away_team,
            });
        }

        Ok(Self {
            date,
            kickoff_time: UNKNOWN.to_string(),
            league: UNKNOWN.to_string(),
            home_team,
            away_team,
            home_odds: NO_ODDS.to_string(),
            draw_odds: NO_ODDS.to_string(),
            away_odds: NO_ODDS.to_string(),
        })
    }

    pub fn with_kickoff_time(mut self, kickoff_time: impl Into<String>) -> Self {
        self.kickoff_time = kickoff_time.into();
        self
    }

    pub fn with_league(mut self, league: impl Into<String>) -> Self {
        self.league = league.into();
        self
    }

    pub fn with_odds(
        mut self,
        home: impl Into<String>,
        draw: impl Into<String>,
        away: impl Into<String>,
    ) -> Self {
        self.home_odds = home.into();
        self.draw_odds = draw.into();
        self.away_odds = away.into();
        self
    }
}

/// A section's raw header label and the calendar date it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub label: String,
    pub date: NaiveDate,
}

/// Formats tried, in order, for the trailing "<day> <month>" token.
const DAY_MONTH_FORMATS: [&str; 2] = ["%d %b %Y", "%d %B %Y"];

impl SectionHeader {
    /// Resolve `label` relative to `today`.
    ///
    /// "today"/"tomorrow" markers win regardless of surrounding text. Otherwise
    /// the text after the last comma, then the last two words, is read as a
    /// day and month in `today`'s year. Returns `None` when neither applies.
    pub fn resolve(label: &str, today: NaiveDate) -> Option<Self> {
        let lower = label.to_lowercase();

        let date = if lower.contains("today") {
            Some(today)
        } else if lower.contains("tomorrow") {
            today.succ_opt()
        } else {
            day_month_candidates(label)
                .iter()
                .find_map(|token| parse_day_month(token, today.year()))
        }?;

        Some(Self {
            label: label.to_string(),
            date,
        })
    }
}

fn day_month_candidates(label: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some((_, tail)) = label.rsplit_once(',') {
        candidates.push(tail.trim().to_string());
    }
    let words: Vec<&str> = label.split_whitespace().collect();
    if let [.., day, month] = words.as_slice() {
        candidates.push(format!("{} {}", day, month));
    }
    candidates
}

fn parse_day_month(token: &str, year: i32) -> Option<NaiveDate> {
    let dated = format!("{} {}", token, year);
    DAY_MONTH_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&dated, fmt).ok())
}

/// `days` consecutive calendar dates starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    days: u32,
}

impl DateWindow {
    pub fn starting(start: NaiveDate, days: u32) -> Self {
        Self { start, days }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let offset = (date - self.start).num_days();
        offset >= 0 && offset < i64::from(self.days)
    }
}
