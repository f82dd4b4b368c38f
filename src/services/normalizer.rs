// src/services/normalizer.rs

//! Record normalizer service.
//!
//! Turns one loosely-structured candidate fragment into a [`JobRecord`],
//! applying a fallback chain per field.

use scraper::{ElementRef, Selector};

use crate::error::{AppError, Result};
use crate::models::{Config, DescriptionContext, DescriptionFormat, JobRecord};
use crate::utils::parse_selector;
use crate::utils::text::{class_contains, element_text, grapheme_len, normalize_whitespace, truncate_graphemes};
use crate::utils::url::normalize_link;

/// Service for normalizing candidate fragments into job records.
pub struct RecordNormalizer {
    config: Config,
    format: DescriptionFormat,
    anchors: Selector,
    any_anchor: Selector,
    headings: Selector,
    heading_or_link: Selector,
    text_blocks: Selector,
}

impl RecordNormalizer {
    /// Create a normalizer using the configured description format.
    pub fn new(config: Config) -> Result<Self> {
        let format = config.feed.description_format;
        Self::with_format(config, format)
    }

    /// Create a normalizer with an explicit description format.
    pub fn with_format(config: Config, format: DescriptionFormat) -> Result<Self> {
        Ok(Self {
            config,
            format,
            anchors: parse_selector("a[href]")?,
            any_anchor: parse_selector("a")?,
            headings: parse_selector("h2, h3, h4")?,
            heading_or_link: parse_selector("h2, h3, h4, a")?,
            text_blocks: parse_selector("span, div, p")?,
        })
    }

    /// Normalize a candidate, returning [`AppError::Extraction`] on rejection.
    pub fn normalize(&self, fragment: &ElementRef<'_>) -> Result<JobRecord> {
        let extraction = &self.config.extraction;

        let href = self
            .link_href(fragment)
            .ok_or_else(|| AppError::extraction(fragment_label(fragment), "no link"))?;
        let link = normalize_link(&self.config.site.origin, &self.config.site.listing_base, href);

        let title = self.title(fragment);
        if title.is_empty() {
            return Err(AppError::extraction(fragment_label(fragment), "empty title"));
        }
        if grapheme_len(&title) < extraction.min_title_len {
            return Err(AppError::extraction(
                fragment_label(fragment),
                format!("title '{title}' is too short"),
            ));
        }
        if extraction.is_stoplisted(&title) {
            return Err(AppError::extraction(
                fragment_label(fragment),
                format!("title '{title}' is a navigation term"),
            ));
        }

        let location = self
            .location(fragment)
            .unwrap_or_else(|| extraction.default_location.clone());
        let department = self.department(fragment).unwrap_or_default();

        let job = JobRecord::new(
            title,
            link,
            location,
            department,
            DescriptionContext {
                format: self.format,
                organization: &self.config.site.organization,
                default_location: &extraction.default_location,
            },
        );

        if !job.is_valid() {
            return Err(AppError::extraction(
                fragment_label(fragment),
                "missing title or link",
            ));
        }
        Ok(job)
    }

    /// Normalize a candidate, logging and discarding rejections.
    pub fn try_normalize(&self, fragment: &ElementRef<'_>) -> Option<JobRecord> {
        match self.normalize(fragment) {
            Ok(job) => {
                log::debug!("  [OK] {}", job.title);
                Some(job)
            }
            Err(e) => {
                log::debug!("  [SKIP] {e}");
                None
            }
        }
    }

    fn link_href<'a>(&self, fragment: &ElementRef<'a>) -> Option<&'a str> {
        if is_anchor(fragment) {
            if let Some(href) = non_empty_href(fragment) {
                return Some(href);
            }
        }
        descendants(*fragment, &self.anchors).find_map(|a| non_empty_href(&a))
    }

    fn title(&self, fragment: &ElementRef<'_>) -> String {
        if is_anchor(fragment) {
            return element_text(fragment);
        }

        // Each step skips elements without visible text, e.g. icon-only links.
        descendants(*fragment, &self.heading_or_link)
            .filter(|el| class_contains(el, "title"))
            .find_map(visible_text)
            .or_else(|| descendants(*fragment, &self.headings).find_map(visible_text))
            .or_else(|| descendants(*fragment, &self.any_anchor).find_map(visible_text))
            .unwrap_or_else(|| {
                truncate_graphemes(
                    &element_text(fragment),
                    self.config.extraction.max_fallback_title_len,
                )
            })
    }

    fn location(&self, fragment: &ElementRef<'_>) -> Option<String> {
        if let Some(el) = self.classed_block(fragment, "location") {
            return Some(element_text(&el));
        }

        let cues = &self.config.extraction.location_cues;
        fragment
            .text()
            .find(|t| cues.iter().any(|cue| t.contains(cue.as_str())))
            .map(normalize_whitespace)
    }

    fn department(&self, fragment: &ElementRef<'_>) -> Option<String> {
        self.classed_block(fragment, "department")
            .map(|el| element_text(&el))
    }

    fn classed_block<'a>(&self, fragment: &ElementRef<'a>, needle: &str) -> Option<ElementRef<'a>> {
        descendants(*fragment, &self.text_blocks).find(|el| class_contains(el, needle))
    }
}

/// Elements strictly below `fragment` matching `selector`, in document order.
fn descendants<'a, 'b>(
    fragment: ElementRef<'a>,
    selector: &'b Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'b
where
    'a: 'b,
{
    let root = fragment.id();
    fragment.select(selector).filter(move |el| el.id() != root)
}

fn visible_text(el: ElementRef<'_>) -> Option<String> {
    let text = element_text(&el);
    (!text.is_empty()).then_some(text)
}

fn is_anchor(el: &ElementRef<'_>) -> bool {
    el.value().name().eq_ignore_ascii_case("a")
}

fn non_empty_href<'a>(el: &ElementRef<'a>) -> Option<&'a str> {
    el.value().attr("href").filter(|href| !href.trim().is_empty())
}

fn fragment_label(el: &ElementRef<'_>) -> String {
    let value = el.value();
    match value.attr("class") {
        Some(class) => format!("<{} class=\"{}\">", value.name(), class),
        None => format!("<{}>", value.name()),
    }
}
