//! Tolerant RSS reader used to recover previously published identities.

use std::collections::HashSet;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{AppError, Result};

/// One `<item>` recovered from a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub guid: String,
}

/// Items of a parsed feed, in document order.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub channel_title: Option<String>,
    pub items: Vec<FeedItem>,
}

impl FeedSnapshot {
    /// Item links, used as known identities.
    pub fn known_links(&self) -> HashSet<String> {
        self.items
            .iter()
            .filter(|item| !item.link.is_empty())
            .map(|item| item.link.clone())
            .collect()
    }
}

/// Field of the current item whose text is being collected.
#[derive(Clone, Copy)]
enum Field {
    Title,
    Link,
    Guid,
}

/// Parses RSS documents produced by [`super::FeedWriter`] or any RSS 2.0 source.
pub struct FeedReader;

impl FeedReader {
    /// Parse an optional document; an absent feed is an empty snapshot.
    pub fn read(bytes: Option<&[u8]>) -> Result<FeedSnapshot> {
        match bytes {
            Some(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(AppError::feed_parse)?;
                Self::parse(text)
            }
            None => Ok(FeedSnapshot::default()),
        }
    }

    /// Parse a document, failing with [`AppError::FeedParse`] when malformed.
    pub fn parse(xml: &str) -> Result<FeedSnapshot> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut snapshot = FeedSnapshot::default();
        let mut saw_rss = false;
        let mut in_channel_title = false;
        let mut item: Option<FeedItem> = None;
        let mut field: Option<Field> = None;
        let mut text = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"rss" => saw_rss = true,
                    b"item" => item = Some(FeedItem::default()),
                    b"title" if item.is_none() && snapshot.channel_title.is_none() => {
                        in_channel_title = true;
                        text.clear();
                    }
                    name if item.is_some() => {
                        field = match name {
                            b"title" => Some(Field::Title),
                            b"link" => Some(Field::Link),
                            b"guid" => Some(Field::Guid),
                            _ => None,
                        };
                        text.clear();
                    }
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"rss" => saw_rss = true,
                Ok(Event::Text(t)) if field.is_some() || in_channel_title => {
                    text.push_str(&t.unescape().map_err(AppError::feed_parse)?);
                }
                Ok(Event::CData(c)) if field.is_some() || in_channel_title => {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"item" => {
                        if let Some(done) = item.take() {
                            snapshot.items.push(done);
                        }
                        field = None;
                    }
                    b"title" if in_channel_title => {
                        snapshot.channel_title = Some(text.trim().to_string());
                        in_channel_title = false;
                    }
                    _ => {
                        if let (Some(current), Some(f)) = (item.as_mut(), field.take()) {
                            let value = text.trim().to_string();
                            match f {
                                Field::Title => current.title = value,
                                Field::Link => current.link = value,
                                Field::Guid => current.guid = value,
                            }
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(AppError::feed_parse(format!(
                        "at byte {}: {e}",
                        reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }

        if !saw_rss {
            return Err(AppError::feed_parse("missing <rss> root element"));
        }
        if item.is_some() {
            return Err(AppError::feed_parse("unterminated <item>"));
        }
        Ok(snapshot)
    }

    /// Known links of an optional document, degrading to an empty set.
    pub fn known_links_or_empty(bytes: Option<&[u8]>) -> HashSet<String> {
        match Self::read(bytes) {
            Ok(snapshot) => snapshot.known_links(),
            Err(e) => {
                log::warn!("Previous feed is unreadable, treating as empty: {e}");
                HashSet::new()
            }
        }
    }
}
