//! Prioritized selector rules per field category

use scraper::{ElementRef, Html, Selector};

use crate::config::SelectorConfig;
use crate::error::ScraperError;

/// How many elements a rule must match to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Exactly(usize),
    AtLeast(usize),
}

impl Cardinality {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Cardinality::Exactly(n) => count == n,
            Cardinality::AtLeast(n) => count >= n,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectorRule {
    css: String,
    selector: Selector,
}

impl SelectorRule {
    pub fn parse(css: &str) -> Result<Self, ScraperError> {
        let selector = Selector::parse(css).map_err(|e| ScraperError::InvalidSelector {
            rule: css.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            css: css.to_string(),
            selector,
        })
    }

    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        self.selector.matches(element)
    }
}

/// The winning rule and the elements it matched.
#[derive(Debug)]
pub struct RuleMatch<'a> {
    pub rule_index: usize,
    pub elements: Vec<ElementRef<'a>>,
}

/// Rules tried in order; the first acceptable one wins and later ones are never consulted.
#[derive(Debug, Clone)]
pub struct RuleList {
    rules: Vec<SelectorRule>,
}

impl RuleList {
    pub fn compile(rules: &[String]) -> Result<Self, ScraperError> {
        let rules = rules
            .iter()
            .map(|css| SelectorRule::parse(css))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn css_rules(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.css.clone()).collect()
    }

    /// First rule whose descendants of `scope` satisfy `cardinality`.
    pub fn select_first<'a>(
        &self,
        scope: ElementRef<'a>,
        cardinality: Cardinality,
    ) -> Option<RuleMatch<'a>> {
        self.rules.iter().enumerate().find_map(|(rule_index, rule)| {
            let elements: Vec<_> = scope.select(&rule.selector).collect();
            cardinality.accepts(elements.len()).then_some(RuleMatch {
                rule_index,
                elements,
            })
        })
    }

    /// Same as [`select_first`](Self::select_first) over a whole document.
    pub fn select_in_document<'a>(
        &self,
        document: &'a Html,
        cardinality: Cardinality,
    ) -> Option<RuleMatch<'a>> {
        self.rules.iter().enumerate().find_map(|(rule_index, rule)| {
            let elements: Vec<_> = document.select(&rule.selector).collect();
            cardinality.accepts(elements.len()).then_some(RuleMatch {
                rule_index,
                elements,
            })
        })
    }

    /// First element matched by the first rule that matches anything.
    pub fn first_element<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.rules
            .iter()
            .find_map(|rule| scope.select(&rule.selector).next())
    }

    /// Nearest element before `element` in document order (ancestors
    /// included), trying rules in priority order. The search never leaves
    /// `scope`, which must contain `element`.
    pub fn find_preceding<'a>(
        &self,
        element: ElementRef<'a>,
        scope: ElementRef<'a>,
    ) -> Option<ElementRef<'a>> {
        self.rules.iter().find_map(|rule| {
            preceding_within(element, scope).find(|el| rule.matches(el))
        })
    }
}

/// [`preceding_elements`] cut off after `scope` itself.
fn preceding_within<'a>(
    element: ElementRef<'a>,
    scope: ElementRef<'a>,
) -> impl Iterator<Item = ElementRef<'a>> {
    let mut left_scope = false;
    preceding_elements(element).take_while(move |el| {
        let inside = !left_scope;
        left_scope |= el.id() == scope.id();
        inside
    })
}

/// Elements before `element` in reverse document order.
pub fn preceding_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    let mut cursor = Some(*element);
    std::iter::from_fn(move || loop {
        let node = cursor?;
        let prev = match node.prev_sibling() {
            Some(mut sibling) => {
                while let Some(child) = sibling.last_child() {
                    sibling = child;
                }
                Some(sibling)
            }
            None => node.parent(),
        };
        cursor = prev;
        if let Some(el) = prev.and_then(ElementRef::wrap) {
            return Some(el);
        }
    })
}

/// Visible text with whitespace runs collapsed.
pub fn text_of(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// All rule lists compiled once per run.
#[derive(Debug, Clone)]
pub struct SelectorSet {
    pub sections: RuleList,
    pub section_headers: RuleList,
    pub matches: RuleList,
    pub teams: RuleList,
    pub odds: RuleList,
    pub kickoff_time: RuleList,
    pub league: RuleList,
    pub challenge_markers: RuleList,
}

impl SelectorSet {
    pub fn compile(config: &SelectorConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            sections: RuleList::compile(&config.sections)?,
            section_headers: RuleList::compile(&config.section_headers)?,
            matches: RuleList::compile(&config.matches)?,
            teams: RuleList::compile(&config.teams)?,
            odds: RuleList::compile(&config.odds)?,
            kickoff_time: RuleList::compile(&config.kickoff_time)?,
            league: RuleList::compile(&config.league)?,
            challenge_markers: RuleList::compile(&config.challenge_markers)?,
        })
    }
}
