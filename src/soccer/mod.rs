//! Soccer listing extraction
//!
//! Date-grouped sections are walked in document order; each match fragment
//! inside the date window is turned into a [`MatchRecord`] by trying selector
//! rules in priority order per field.

mod extractor;
#[cfg(test)]
pub(crate) mod fixtures;
mod selectors;
mod types;
mod walker;

pub use extractor::MatchExtractor;
pub use selectors::{
    preceding_elements, text_of, Cardinality, RuleList, RuleMatch, SelectorRule, SelectorSet,
};
pub use types::{DateWindow, MatchRecord, SectionHeader, NO_ODDS, UNKNOWN};
pub use walker::SectionWalker;
