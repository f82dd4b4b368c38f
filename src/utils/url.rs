// src/utils/url.rs

//! URL manipulation utilities.

/// Turn an href scraped from the listing into an absolute link.
///
/// # Examples
/// ```
/// use wbjobs::utils::url::normalize_link;
///
/// assert_eq!(
///     normalize_link(
///         "https://worldbankgroup.csod.com",
///         "https://worldbankgroup.csod.com/ux/ats/careersite/1/",
///         "/job/123",
///     ),
///     "https://worldbankgroup.csod.com/job/123"
/// );
/// ```
pub fn normalize_link(origin: &str, listing_base: &str, href: &str) -> String {
    let href = href.trim();

    // Already absolute
    if href.starts_with("http") {
        return href.to_string();
    }

    // Root-relative - combine with the site origin
    if href.starts_with('/') {
        return format!("{}{href}", origin.trim_end_matches('/'));
    }

    // Bare relative - combine with the listing base path
    let base = if listing_base.ends_with('/') {
        listing_base.to_string()
    } else {
        format!("{listing_base}/")
    };
    format!("{base}{href}")
}

/// Scheme, host and port of a URL, without a trailing slash.
pub fn origin_of(url_str: &str) -> Option<String> {
    let parsed = url::Url::parse(url_str).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}
