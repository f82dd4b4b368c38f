//! Text helpers shared by the locator and the normalizer.

use scraper::ElementRef;
use unicode_segmentation::UnicodeSegmentation;

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element, whitespace-normalized.
pub fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// Keep at most `max` user-perceived characters.
pub fn truncate_graphemes(s: &str, max: usize) -> String {
    s.graphemes(true).take(max).collect()
}

/// Length in user-perceived characters.
pub fn grapheme_len(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Whether the element's `class` attribute contains `needle`, ignoring case.
pub fn class_contains(element: &ElementRef<'_>, needle: &str) -> bool {
    element
        .value()
        .attr("class")
        .is_some_and(|class| class.to_lowercase().contains(&needle.to_lowercase()))
}
