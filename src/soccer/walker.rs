//! Date-grouped section traversal

use std::time::Duration;

use scraper::Html;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::extractor::MatchExtractor;
use super::selectors::{text_of, Cardinality, SelectorSet};
use super::types::{DateWindow, MatchRecord, SectionHeader};
use crate::browser::{js_literal, DomPredicate};
use crate::output::RecordAssembler;
use crate::traits::Renderer;

/// Walks sections in document order, keeping those inside the date window.
#[derive(Debug, Clone, Copy)]
pub struct SectionWalker<'s> {
    selectors: &'s SelectorSet,
    window: DateWindow,
}

impl<'s> SectionWalker<'s> {
    pub fn new(selectors: &'s SelectorSet, window: DateWindow) -> Self {
        Self { selectors, window }
    }

    /// Records from a static markup snapshot, section order then fragment order.
    pub fn walk(&self, markup: &str) -> Vec<MatchRecord> {
        let mut assembler = RecordAssembler::new();
        self.walk_into(markup, &mut assembler);
        assembler.into_records()
    }

    pub fn walk_into(&self, markup: &str, assembler: &mut RecordAssembler) {
        let document = Html::parse_document(markup);
        let extractor = MatchExtractor::new(self.selectors);

        let Some(sections) = self
            .selectors
            .sections
            .select_in_document(&document, Cardinality::AtLeast(1))
        else {
            info!("No date sections found in markup");
            return;
        };
        info!("Found {} sections", sections.elements.len());

        for (i, section) in sections.elements.into_iter().enumerate() {
            let Some(header_el) = self.selectors.section_headers.first_element(section) else {
                debug!("Section {} has no header, skipping", i + 1);
                continue;
            };
            let label = text_of(&header_el);

            let Some(header) = SectionHeader::resolve(&label, self.window.start()) else {
                warn!("Section {} header '{}' is not a date, skipping", i + 1, label);
                continue;
            };

            if !self.window.contains(header.date) {
                debug!(
                    "Section {} ({}) resolved to {} outside window, skipping",
                    i + 1,
                    header.label,
                    header.date
                );
                continue;
            }

            let fragments = self
                .selectors
                .matches
                .select_first(section, Cardinality::AtLeast(1))
                .map(|m| m.elements)
                .unwrap_or_default();
            info!(
                "Section {} ({}): {} matches",
                i + 1,
                header.label,
                fragments.len()
            );

            assembler.extend(
                fragments
                    .into_iter()
                    .filter_map(|fragment| {
                        extractor.extract_or_skip(fragment, section, header.date)
                    }),
            );
        }
    }

    /// Nudge lazily rendered sections into the DOM. Never fails: a section that
    /// does not fill in simply contributes nothing later.
    pub async fn trigger_lazy_load<R: Renderer + ?Sized>(
        &self,
        renderer: &R,
        scroll_passes: u32,
        delay: Duration,
    ) {
        for pass in 0..scroll_passes {
            if let Err(e) = renderer
                .run_script("window.scrollTo(0, document.body.scrollHeight)")
                .await
            {
                warn!("Scroll pass {} failed: {}", pass + 1, e);
            }
            sleep(delay).await;
        }

        let section_rules = self.selectors.sections.css_rules();
        let match_rules = self.selectors.matches.css_rules();

        let count = match renderer.run_script(&section_count_script(&section_rules)).await {
            Ok(value) => value.as_u64().unwrap_or(0),
            Err(e) => {
                warn!("Could not count sections: {}", e);
                return;
            }
        };
        debug!("Triggering lazy load for {} sections", count);

        for index in 0..count {
            match renderer
                .run_script(&scroll_section_script(&section_rules, index))
                .await
            {
                Ok(value) if value.as_bool() == Some(true) => {}
                Ok(_) => {
                    debug!("Section {} vanished before scrolling", index + 1);
                    continue;
                }
                Err(e) => {
                    warn!("Scrolling section {} failed: {}", index + 1, e);
                    continue;
                }
            }

            let populated = section_populated(&section_rules, &match_rules, index);
            match renderer.wait_until(&populated, delay).await {
                Ok(()) => {}
                Err(e) if e.is_timeout() => debug!("Section {} unavailable", index + 1),
                Err(e) => warn!("Section {} load check failed: {}", index + 1, e),
            }
        }
    }
}

/// JS: element count of the first section rule that matches anything.
fn section_count_script(section_rules: &[String]) -> String {
    format!(
        "(() => {{ for (const s of {}) {{ const n = document.querySelectorAll(s).length; if (n > 0) return n; }} return 0; }})()",
        js_literal(section_rules)
    )
}

/// JS body that binds `el` to section `index` (or undefined).
fn section_lookup(section_rules: &[String], index: u64) -> String {
    format!(
        "let el; for (const s of {}) {{ const all = document.querySelectorAll(s); if (all.length > 0) {{ el = all[{}]; break; }} }}",
        js_literal(section_rules),
        index
    )
}

fn scroll_section_script(section_rules: &[String], index: u64) -> String {
    format!(
        "(() => {{ {} if (!el) return false; el.scrollIntoView(); return true; }})()",
        section_lookup(section_rules, index)
    )
}

fn section_populated(section_rules: &[String], match_rules: &[String], index: u64) -> DomPredicate {
    DomPredicate::new(
        format!("matches in section {}", index + 1),
        format!(
            "(() => {{ {} return !!el && {}.some(m => el.querySelector(m) !== null); }})()",
            section_lookup(section_rules, index),
            js_literal(match_rules)
        ),
    )
}
