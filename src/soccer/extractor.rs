//! Per-match field extraction with ordered selector fallback

use chrono::NaiveDate;
use scraper::ElementRef;
use tracing::debug;

use super::selectors::{text_of, Cardinality, SelectorSet};
use super::types::{MatchRecord, UNKNOWN};
use crate::error::ExtractionFailure;

const TEAM_CARDINALITY: Cardinality = Cardinality::Exactly(2);
const ODDS_CARDINALITY: Cardinality = Cardinality::AtLeast(3);

/// Turns one match fragment into a [`MatchRecord`].
#[derive(Debug, Clone, Copy)]
pub struct MatchExtractor<'s> {
    selectors: &'s SelectorSet,
}

impl<'s> MatchExtractor<'s> {
    pub fn new(selectors: &'s SelectorSet) -> Self {
        Self { selectors }
    }

    /// `section` bounds the backward search for the league label.
    pub fn extract<'a>(
        &self,
        fragment: ElementRef<'a>,
        section: ElementRef<'a>,
        date: NaiveDate,
    ) -> Result<MatchRecord, ExtractionFailure> {
        let teams = self
            .selectors
            .teams
            .select_first(fragment, TEAM_CARDINALITY)
            .ok_or(ExtractionFailure::TeamsNotFound {
                rules_tried: self.selectors.teams.len(),
            })?;
        let home = text_of(&teams.elements[0]);
        let away = text_of(&teams.elements[1]);

        let mut record = MatchRecord::new(date, home, away)?;

        // Only the first three prices are home/draw/away.
        if let Some(odds) = self.selectors.odds.select_first(fragment, ODDS_CARDINALITY) {
            let mut prices = odds.elements.iter().map(text_of);
            if let (Some(home), Some(draw), Some(away)) = (prices.next(), prices.next(), prices.next()) {
                record = record.with_odds(home, draw, away);
            }
        }

        let kickoff = self
            .selectors
            .kickoff_time
            .first_element(fragment)
            .map(|el| text_of(&el))
            .filter(|t| !t.is_empty());
        record = record.with_kickoff_time(kickoff.unwrap_or_else(|| UNKNOWN.to_string()));

        let league = self
            .selectors
            .league
            .find_preceding(fragment, section)
            .map(|el| text_of(&el))
            .filter(|t| !t.is_empty());
        record = record.with_league(league.unwrap_or_else(|| UNKNOWN.to_string()));

        Ok(record)
    }

    /// [`extract`](Self::extract), logging and dropping the failure.
    pub fn extract_or_skip<'a>(
        &self,
        fragment: ElementRef<'a>,
        section: ElementRef<'a>,
        date: NaiveDate,
    ) -> Option<MatchRecord> {
        match self.extract(fragment, section, date) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Skipping match fragment: {}", e);
                None
            }
        }
    }
}
