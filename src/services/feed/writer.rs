//! Deterministic RSS 2.0 writer.

use std::io::Write;

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{AppError, Result};
use crate::models::{DescriptionFormat, JobRecord};
use crate::pipeline::dedup::numeric_id;
use crate::services::feed::{ATOM_NS, Channel, rfc822};

/// Serializes job records into an RSS 2.0 document.
pub struct FeedWriter {
    channel: Channel,
    format: DescriptionFormat,
}

impl FeedWriter {
    pub fn new(channel: Channel, format: DescriptionFormat) -> Self {
        Self { channel, format }
    }

    /// Build the whole document in memory.
    ///
    /// `built_at` is used for every timestamp in the document, so the same
    /// jobs and time always produce the same bytes.
    pub fn write(&self, jobs: &[JobRecord], built_at: DateTime<Utc>) -> Result<Vec<u8>> {
        let stamp = rfc822(built_at);
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(AppError::serialization)?;
        writer
            .write_event(Event::Start(
                BytesStart::new("rss").with_attributes([("version", "2.0"), ("xmlns:atom", ATOM_NS)]),
            ))
            .map_err(AppError::serialization)?;
        start(&mut writer, "channel")?;

        text_element(&mut writer, "title", &self.channel.title)?;
        text_element(&mut writer, "link", &self.channel.link)?;
        text_element(&mut writer, "description", &self.channel.description)?;
        text_element(&mut writer, "language", &self.channel.language)?;

        if let Some(self_link) = &self.channel.self_link {
            writer
                .write_event(Event::Empty(BytesStart::new("atom:link").with_attributes([
                    ("href", self_link.as_str()),
                    ("rel", "self"),
                    ("type", "application/rss+xml"),
                ])))
                .map_err(AppError::serialization)?;
        }

        match self.format {
            DescriptionFormat::Summary => text_element(&mut writer, "lastBuildDate", &stamp)?,
            DescriptionFormat::Narrative => text_element(&mut writer, "pubDate", &stamp)?,
        }

        for job in jobs {
            self.write_item(&mut writer, job, &stamp)?;
        }

        end(&mut writer, "channel")?;
        end(&mut writer, "rss")?;

        let raw = String::from_utf8(writer.into_inner()).map_err(AppError::serialization)?;
        Ok(strip_blank_lines(&raw).into_bytes())
    }

    fn write_item<W: Write>(&self, writer: &mut Writer<W>, job: &JobRecord, stamp: &str) -> Result<()> {
        start(writer, "item")?;
        text_element(writer, "title", &job.title)?;
        text_element(writer, "link", &job.link)?;
        text_element(writer, "description", &job.description)?;

        match self.format {
            DescriptionFormat::Summary => {
                attributed_element(writer, "guid", &[("isPermaLink", "true")], &job.link)?;
            }
            DescriptionFormat::Narrative => {
                attributed_element(writer, "guid", &[("isPermaLink", "false")], &numeric_id(&job.link))?;
                text_element(writer, "pubDate", stamp)?;
                attributed_element(
                    writer,
                    "source",
                    &[("url", self.channel.source_url.as_str())],
                    &self.channel.title,
                )?;
            }
        }

        end(writer, "item")
    }
}

/// Drop whitespace-only lines and join the rest with `\n`.
pub fn strip_blank_lines(xml: &str) -> String {
    xml.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(AppError::serialization)
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(AppError::serialization)
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    attributed_element(writer, name, &[], text)
}

fn attributed_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    attributes: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
    writer
        .write_event(Event::Start(element))
        .map_err(AppError::serialization)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(AppError::serialization)?;
    end(writer, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn channel() -> Channel {
        Channel {
            title: "World Bank Group Jobs".into(),
            link: "https://worldbankgroup.csod.com/ux/ats/careersite/1/home?c=worldbankgroup".into(),
            description: "Job listings from World Bank Group".into(),
            language: "en-us".into(),
            self_link: Some("https://example.org/worldbank_jobs.xml".into()),
            source_url: "https://worldbankgroup.csod.com/ux/ats/careersite/1/home?c=worldbankgroup"
                .into(),
        }
    }

    fn job(title: &str, link: &str) -> JobRecord {
        JobRecord {
            title: title.into(),
            link: link.into(),
            location: "Washington, DC".into(),
            department: String::new(),
            description: format!("{title} | Location: Washington, DC"),
        }
    }

    fn built_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()
    }

    fn render(format: DescriptionFormat, jobs: &[JobRecord]) -> String {
        let bytes = FeedWriter::new(channel(), format).write(jobs, built_at()).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_summary_layout() {
        let xml = render(
            DescriptionFormat::Summary,
            &[job("Economist II", "https://worldbankgroup.csod.com/job/1")],
        );
        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>World Bank Group Jobs</title>
    <link>https://worldbankgroup.csod.com/ux/ats/careersite/1/home?c=worldbankgroup</link>
    <description>Job listings from World Bank Group</description>
    <language>en-us</language>
    <atom:link href="https://example.org/worldbank_jobs.xml" rel="self" type="application/rss+xml"/>
    <lastBuildDate>Mon, 02 Mar 2026 09:30:00 +0000</lastBuildDate>
    <item>
      <title>Economist II</title>
      <link>https://worldbankgroup.csod.com/job/1</link>
      <description>Economist II | Location: Washington, DC</description>
      <guid isPermaLink="true">https://worldbankgroup.csod.com/job/1</guid>
    </item>
  </channel>
</rss>"#;
        assert_eq!(xml, expected);
    }

    #[test]
    fn test_narrative_items() {
        let link = "https://worldbankgroup.csod.com/job/2";
        let xml = render(DescriptionFormat::Narrative, &[job("Senior Economist", link)]);

        assert!(xml.contains("    <pubDate>Mon, 02 Mar 2026 09:30:00 +0000</pubDate>\n"));
        assert!(xml.contains(&format!(
            "      <guid isPermaLink=\"false\">{}</guid>",
            numeric_id(link)
        )));
        assert!(xml.contains("      <pubDate>Mon, 02 Mar 2026 09:30:00 +0000</pubDate>"));
        assert!(xml.contains(
            "      <source url=\"https://worldbankgroup.csod.com/ux/ats/careersite/1/home?c=worldbankgroup\">World Bank Group Jobs</source>"
        ));
        assert!(!xml.contains("lastBuildDate"));
    }

    #[test]
    fn test_narrative_items_share_the_run_timestamp() {
        let jobs = vec![
            job("Senior Economist", "https://worldbankgroup.csod.com/job/2"),
            job("Data Scientist", "https://worldbankgroup.csod.com/job/3"),
        ];
        let xml = render(DescriptionFormat::Narrative, &jobs);

        let item_dates: Vec<&str> = xml
            .lines()
            .filter(|line| line.starts_with("      <pubDate>"))
            .collect();
        assert_eq!(item_dates.len(), 2);
        assert_eq!(item_dates[0], item_dates[1]);
        assert_eq!(
            item_dates[0],
            "      <pubDate>Mon, 02 Mar 2026 09:30:00 +0000</pubDate>"
        );
        assert_eq!(xml.matches("<source url=").count(), 2);
    }

    #[test]
    fn test_special_characters_escaped() {
        let xml = render(
            DescriptionFormat::Summary,
            &[job("R&D <Lead> Analyst", "https://example.com/job?a=1&b=2")],
        );

        assert!(xml.contains("<title>R&amp;D &lt;Lead&gt; Analyst</title>"));
        assert!(xml.contains("<link>https://example.com/job?a=1&amp;b=2</link>"));
        assert!(!xml.contains("R&D"));
    }

    #[test]
    fn test_no_blank_lines_and_deterministic() {
        let jobs = vec![
            job("Economist II", "https://example.com/1"),
            job("Data Scientist", "https://example.com/2"),
        ];
        let first = render(DescriptionFormat::Narrative, &jobs);
        let second = render(DescriptionFormat::Narrative, &jobs);

        assert_eq!(first, second);
        assert!(first.split('\n').all(|line| !line.trim().is_empty()));
    }

    #[test]
    fn test_empty_feed_has_channel_only() {
        let xml = render(DescriptionFormat::Narrative, &[]);
        assert!(xml.contains("<channel>"));
        assert!(!xml.contains("<item>"));
    }

    #[test]
    fn test_strip_blank_lines() {
        assert_eq!(strip_blank_lines("<a>\n\n  \n  <b/>\n</a>\n"), "<a>\n  <b/>\n</a>");
    }
}
