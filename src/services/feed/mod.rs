//! RSS 2.0 feed codec.
//!
//! - `FeedWriter`: job records to a pretty-printed, byte-stable document
//! - `FeedReader`: a previously written document back to its items

mod reader;
mod writer;

use chrono::{DateTime, Utc};

use crate::models::Config;

pub use reader::{FeedItem, FeedReader, FeedSnapshot};
pub use writer::{FeedWriter, strip_blank_lines};

pub(crate) const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Channel-level metadata of the feed.
#[derive(Debug, Clone)]
pub struct Channel {
    pub title: String,
    /// Subject of the feed (the careers page)
    pub link: String,
    pub description: String,
    pub language: String,
    /// Public URL of the feed document itself
    pub self_link: Option<String>,
    /// Origin referenced by each item's `source` element
    pub source_url: String,
}

impl Channel {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.feed.title.clone(),
            link: config.site.url.clone(),
            description: config.feed.description.clone(),
            language: config.feed.language.clone(),
            self_link: config.feed.self_link.clone(),
            source_url: config.site.url.clone(),
        }
    }
}

/// RFC-822 timestamp in UTC, as used by RSS date elements.
pub fn rfc822(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}
