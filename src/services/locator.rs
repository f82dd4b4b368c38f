// src/services/locator.rs

//! Candidate locator service.
//!
//! The careers site is rendered by a third-party ATS whose markup drifts, so
//! job postings are located with a cascade of structural heuristics. The
//! first strategy that yields anything wins; results are never merged.

use std::fmt;

use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::ExtractionConfig;
use crate::utils::parse_selector;
use crate::utils::text::{class_contains, grapheme_len, normalize_whitespace};

/// One heuristic for finding job postings in a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Containers whose class names contain a job keyword
    ClassHint,
    /// Anchors pointing at a requisition
    RequisitionLink,
    /// Containers holding a heading-or-link and a link with an href
    Structural,
}

impl Strategy {
    /// Priority order of the cascade.
    pub const CASCADE: [Strategy; 3] = [
        Strategy::ClassHint,
        Strategy::RequisitionLink,
        Strategy::Structural,
    ];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::ClassHint => f.write_str("class-hint"),
            Strategy::RequisitionLink => f.write_str("requisition-link"),
            Strategy::Structural => f.write_str("structural"),
        }
    }
}

/// Candidates found in a document and the strategy that produced them.
#[derive(Debug)]
pub struct Located<'a> {
    pub strategy: Option<Strategy>,
    /// Number found by the winning strategy before the cap
    pub found: usize,
    pub candidates: Vec<ElementRef<'a>>,
}

/// Service for locating candidate job fragments in a rendered page.
pub struct CandidateLocator {
    config: ExtractionConfig,
    containers: Selector,
    blocks: Selector,
    anchors: Selector,
    heading_or_link: Selector,
}

impl CandidateLocator {
    /// Create a locator with the given extraction rules.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        Ok(Self {
            config,
            containers: parse_selector("div, article, li")?,
            blocks: parse_selector("div, article")?,
            anchors: parse_selector("a[href]")?,
            heading_or_link: parse_selector("h2, h3, h4, a")?,
        })
    }

    /// Run the cascade against a document, capped at `candidate_cap`.
    pub fn locate<'a>(&self, document: &'a Html) -> Located<'a> {
        for strategy in Strategy::CASCADE {
            let mut candidates = self.apply(strategy, document);
            log::debug!("Strategy {strategy}: found {} candidates", candidates.len());

            if !candidates.is_empty() {
                let found = candidates.len();
                candidates.truncate(self.config.candidate_cap);
                log::info!(
                    "Strategy {strategy} matched {found} candidates, processing {}",
                    candidates.len()
                );
                return Located {
                    strategy: Some(strategy),
                    found,
                    candidates,
                };
            }
        }

        log::warn!("No candidates found by any strategy");
        Located {
            strategy: None,
            found: 0,
            candidates: Vec::new(),
        }
    }

    /// Apply a single strategy, uncapped.
    pub fn apply<'a>(&self, strategy: Strategy, document: &'a Html) -> Vec<ElementRef<'a>> {
        match strategy {
            Strategy::ClassHint => self.by_class_hint(document),
            Strategy::RequisitionLink => self.by_requisition_link(document),
            Strategy::Structural => self.by_structure(document),
        }
    }

    fn by_class_hint<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document
            .select(&self.containers)
            .filter(|el| {
                self.config
                    .class_keywords
                    .iter()
                    .any(|keyword| class_contains(el, keyword))
            })
            .collect()
    }

    fn by_requisition_link<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let keyword = self.config.link_keyword.to_lowercase();
        document
            .select(&self.anchors)
            .filter(|a| {
                a.value()
                    .attr("href")
                    .is_some_and(|href| href.to_lowercase().contains(&keyword))
            })
            .filter(|a| {
                let text = normalize_whitespace(&a.text().collect::<String>());
                grapheme_len(&text) > self.config.min_link_text_len
            })
            .collect()
    }

    fn by_structure<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document
            .select(&self.blocks)
            .filter(|el| {
                has_descendant(el, &self.heading_or_link) && has_descendant(el, &self.anchors)
            })
            .collect()
    }
}

/// Whether any element strictly below `el` matches `selector`.
fn has_descendant(el: &ElementRef<'_>, selector: &Selector) -> bool {
    el.select(selector).any(|found| found.id() != el.id())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> CandidateLocator {
        CandidateLocator::new(ExtractionConfig::default()).unwrap()
    }

    #[test]
    fn test_class_hint_wins_over_links() {
        let html = Html::parse_document(
            r#"<ul>
                 <li class="Job-Card"><a href="/job/1">Economist II</a></li>
                 <li class="vacancy-row"><a href="/job/2">Senior Analyst</a></li>
               </ul>
               <a href="/requisition/3">Standalone requisition link</a>"#,
        );
        let located = locator().locate(&html);

        assert_eq!(located.strategy, Some(Strategy::ClassHint));
        assert_eq!(located.candidates.len(), 2);
        assert_eq!(located.candidates[0].value().name(), "li");
    }

    #[test]
    fn test_requisition_links_when_no_class_hint() {
        let html = Html::parse_document(
            r#"<div>
                 <a href="/ux/ats/careersite/1/home/REQUISITION/101">Operations Officer</a>
                 <a href="/requisition/102">Apply</a>
                 <a href="/about">About the World Bank</a>
               </div>"#,
        );
        let located = locator().locate(&html);

        assert_eq!(located.strategy, Some(Strategy::RequisitionLink));
        assert_eq!(located.candidates.len(), 1);
        assert_eq!(
            located.candidates[0].value().attr("href"),
            Some("/ux/ats/careersite/1/home/REQUISITION/101")
        );
    }

    #[test]
    fn test_structural_fallback() {
        let html = Html::parse_document(
            r#"<section>
                 <article><h3>Procurement Specialist</h3><a href="/job/7">Details</a></article>
                 <article><h3>No link here</h3></article>
               </section>"#,
        );
        let located = locator().locate(&html);

        assert_eq!(located.strategy, Some(Strategy::Structural));
        assert_eq!(located.candidates.len(), 1);
        assert_eq!(located.candidates[0].value().name(), "article");
    }

    #[test]
    fn test_empty_document_yields_nothing() {
        let html = Html::parse_document("<html><body><p>Maintenance</p></body></html>");
        let located = locator().locate(&html);

        assert!(located.candidates.is_empty());
        assert_eq!(located.strategy, None);
        assert_eq!(located.found, 0);
    }

    #[test]
    fn test_cap_limits_candidates() {
        let items: String = (0..60)
            .map(|i| format!(r#"<div class="job-item"><a href="/job/{i}">Position {i}</a></div>"#))
            .collect();
        let html = Html::parse_document(&items);
        let located = locator().locate(&html);

        assert_eq!(located.found, 60);
        assert_eq!(located.candidates.len(), 50);
    }

    #[test]
    fn test_strategies_are_independent() {
        let html = Html::parse_document(
            r#"<div class="position"><a href="/requisition/5">Country Economist</a></div>"#,
        );
        let locator = locator();

        assert_eq!(locator.apply(Strategy::ClassHint, &html).len(), 1);
        assert_eq!(locator.apply(Strategy::RequisitionLink, &html).len(), 1);
        assert_eq!(locator.apply(Strategy::Structural, &html).len(), 1);
    }
}
