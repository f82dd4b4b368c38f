// src/pipeline/run.rs

//! End-to-end scrape run: render, locate, normalize, dedup, publish.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use scraper::Html;

use crate::error::Result;
use crate::models::Config;
use crate::models::JobRecord;
use crate::pipeline::dedup::Deduplicator;
use crate::services::feed::{Channel, FeedReader, FeedWriter};
use crate::services::{CandidateLocator, RecordNormalizer, Renderer, Strategy};
use crate::storage::{FeedStore, SeenLedger, load_seen_or_empty};

/// Jobs extracted from one rendered page.
#[derive(Debug, Default)]
pub struct Extraction {
    pub strategy: Option<Strategy>,
    /// Candidates found before the cap
    pub found: usize,
    /// Candidates handed to the normalizer
    pub processed: usize,
    pub jobs: Vec<JobRecord>,
}

impl Extraction {
    pub fn skipped(&self) -> usize {
        self.processed - self.jobs.len()
    }
}

/// Counts reported at the end of every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub strategy: Option<Strategy>,
    pub found: usize,
    pub processed: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub new: usize,
    pub known: usize,
    /// Items in the written feed
    pub published: usize,
    /// Where the feed was written, if it was
    pub written_to: Option<String>,
}

impl RunSummary {
    pub fn log(&self) {
        let strategy = self
            .strategy
            .map_or_else(|| "none".to_string(), |s| s.to_string());
        log::info!("Summary:");
        log::info!("    Strategy:   {strategy}");
        log::info!("    Discovered: {} ({} processed)", self.found, self.processed);
        log::info!("    Accepted:   {}", self.accepted);
        log::info!("    Skipped:    {}", self.skipped);
        log::info!("    New:        {}", self.new);
        log::info!("    Known:      {}", self.known);
        match &self.written_to {
            Some(path) => log::info!("    Feed:       {} items -> {path}", self.published),
            None => log::info!("    Feed:       not written"),
        }
    }
}

/// Locate and normalize every job in a rendered page.
pub fn extract_jobs(config: &Config, html: &str) -> Result<Extraction> {
    let locator = CandidateLocator::new(config.extraction.clone())?;
    let normalizer = RecordNormalizer::new(config.clone())?;

    let document = Html::parse_document(html);
    let located = locator.locate(&document);

    log::info!("Processing {} potential job listings...", located.candidates.len());
    let jobs: Vec<JobRecord> = located
        .candidates
        .iter()
        .filter_map(|candidate| normalizer.try_normalize(candidate))
        .collect();

    Ok(Extraction {
        strategy: located.strategy,
        found: located.found,
        processed: located.candidates.len(),
        jobs,
    })
}

/// Identities already published: the previous feed plus the seen ledger.
pub async fn load_known(config: &Config, storage: &dyn FeedStore) -> (HashSet<String>, SeenLedger) {
    let previous = match storage.read_feed(&config.feed.output_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Could not read previous feed: {e}");
            None
        }
    };
    let mut known = FeedReader::known_links_or_empty(previous.as_deref());

    let ledger = load_seen_or_empty(storage, &config.feed.seen_path).await;
    known.extend(ledger.links());

    (known, ledger)
}

/// Serialize `jobs` and replace the published feed.
async fn publish(
    config: &Config,
    storage: &dyn FeedStore,
    jobs: &[JobRecord],
    now: DateTime<Utc>,
) -> Result<()> {
    let writer = FeedWriter::new(Channel::from_config(config), config.feed.description_format);
    let bytes = writer.write(jobs, now)?;
    storage.write_feed(&config.feed.output_path, &bytes).await
}

/// Run the scraper once.
///
/// Render failures and feed write failures abort the run and leave the
/// existing feed untouched. Everything else degrades and is counted.
pub async fn run_scraper(
    config: &Config,
    renderer: &dyn Renderer,
    storage: &dyn FeedStore,
    now: DateTime<Utc>,
) -> Result<RunSummary> {
    log::info!("Starting scraper for: {}", config.site.url);
    let html = match renderer.render(&config.site.url, &config.render).await {
        Ok(html) => html,
        Err(e) => {
            log::error!("Page could not be rendered: {e}");
            RunSummary::default().log();
            return Err(e);
        }
    };

    let extraction = extract_jobs(config, &html)?;
    log::info!("Successfully scraped {} jobs", extraction.jobs.len());

    let mut summary = RunSummary {
        strategy: extraction.strategy,
        found: extraction.found,
        processed: extraction.processed,
        accepted: extraction.jobs.len(),
        skipped: extraction.skipped(),
        ..RunSummary::default()
    };

    if extraction.jobs.is_empty() {
        log::warn!("0 jobs found. Please check the website structure.");
        if !config.feed.dedup_enabled {
            summary.log();
            return Ok(summary);
        }
    }

    let (known, mut ledger) = if config.feed.dedup_enabled {
        load_known(config, storage).await
    } else {
        (HashSet::new(), SeenLedger::default())
    };
    let deduper = Deduplicator::new(known);
    log::info!("{} previously published jobs", deduper.known_count());

    let partition = deduper.partition(extraction.jobs);
    summary.duplicates = partition.duplicates;
    summary.new = partition.new.len();
    summary.known = partition.known.len();
    if partition.has_new() {
        log::info!("{} new of {} distinct jobs", partition.new.len(), partition.total());
    } else {
        log::info!("No new jobs since the last run");
    }

    // The existing feed stays in place when either step fails
    if let Err(e) = publish(config, storage, &partition.new, now).await {
        log::error!("Feed not written: {e}");
        summary.log();
        return Err(e);
    }
    summary.published = partition.new.len();
    summary.written_to = Some(config.feed.output_path.clone());

    if config.feed.dedup_enabled {
        let links = partition
            .new
            .iter()
            .chain(partition.known.iter())
            .map(|job| job.link.as_str());
        let added = ledger.record(links, now);
        if let Some(cutoff) = config
            .feed
            .seen_retention()
            .and_then(|retention| now.checked_sub_signed(retention))
        {
            let pruned = ledger.prune(cutoff);
            if pruned > 0 {
                log::info!("Dropped {pruned} ledger entries not seen since {cutoff}");
            }
        }
        if let Err(e) = storage.save_seen(&config.feed.seen_path, &ledger).await {
            log::error!("Failed to update seen ledger: {e}");
        } else {
            log::debug!("Seen ledger: {added} added, {} total", ledger.len());
        }
    }

    summary.log();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::error::AppError;
    use crate::models::{DescriptionFormat, RenderConfig};
    use crate::pipeline::dedup::numeric_id;
    use crate::storage::MemoryStorage;

    /// Records log lines per thread so parallel tests do not see each other.
    mod capture {
        use std::sync::{Mutex, Once};
        use std::thread::{self, ThreadId};

        static LINES: Mutex<Vec<(ThreadId, String)>> = Mutex::new(Vec::new());
        static INIT: Once = Once::new();
        static LOGGER: Capture = Capture;

        struct Capture;

        impl log::Log for Capture {
            fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
                true
            }

            fn log(&self, record: &log::Record<'_>) {
                if let Ok(mut lines) = LINES.lock() {
                    lines.push((thread::current().id(), record.args().to_string()));
                }
            }

            fn flush(&self) {}
        }

        pub fn install() {
            INIT.call_once(|| {
                let _ = log::set_logger(&LOGGER);
                log::set_max_level(log::LevelFilter::Info);
            });
        }

        pub fn lines() -> Vec<String> {
            let me = thread::current().id();
            LINES
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| *id == me)
                .map(|(_, line)| line.clone())
                .collect()
        }
    }

    struct StaticRenderer(String);

    #[async_trait]
    impl Renderer for StaticRenderer {
        async fn render(&self, _url: &str, _config: &RenderConfig) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl Renderer for BrokenRenderer {
        async fn render(&self, url: &str, config: &RenderConfig) -> Result<String> {
            Err(AppError::RenderTimeout {
                url: url.to_string(),
                secs: config.timeout_secs,
            })
        }
    }

    fn listing(ids: &[u32]) -> String {
        let cards: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<div class="job-card"><a class="job-title" href="/job/{id}">Economist Grade {id}</a>
                       <span class="location">Washington, DC</span></div>"#
                )
            })
            .collect();
        format!("<html><body><nav><a href='/home'>Home</a></nav>{cards}</body></html>")
    }

    fn config(dedup: bool, format: DescriptionFormat) -> Config {
        let mut config = Config::default();
        config.feed.dedup_enabled = dedup;
        config.feed.description_format = format;
        config
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap()
    }

    fn feed_links(storage: &MemoryStorage, key: &str) -> HashSet<String> {
        let xml = storage.get_string(key).unwrap();
        FeedReader::parse(&xml).unwrap().known_links()
    }

    #[tokio::test]
    async fn test_no_dedup_publishes_everything() {
        let config = config(false, DescriptionFormat::Summary);
        let storage = MemoryStorage::new();
        let renderer = StaticRenderer(listing(&[1, 2]));

        let summary = run_scraper(&config, &renderer, &storage, now()).await.unwrap();

        assert_eq!(summary.strategy, Some(Strategy::ClassHint));
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.published, 2);
        let xml = storage.get_string("worldbank_jobs.xml").unwrap();
        assert!(xml.contains(r#"<guid isPermaLink="true">https://worldbankgroup.csod.com/job/1</guid>"#));
        assert!(xml.contains("<lastBuildDate>Mon, 04 May 2026 08:00:00 +0000</lastBuildDate>"));
        assert!(xml.lines().all(|l| !l.trim().is_empty()));
    }

    #[tokio::test]
    async fn test_dedup_writes_only_new_jobs() {
        let config = config(true, DescriptionFormat::Narrative);
        let storage = MemoryStorage::new();

        // Prior feed contains X = job/1
        run_scraper(&config, &StaticRenderer(listing(&[1])), &storage, now())
            .await
            .unwrap();

        // Current candidates {X, Y}
        let summary = run_scraper(&config, &StaticRenderer(listing(&[1, 2])), &storage, now())
            .await
            .unwrap();

        assert_eq!(summary.new, 1);
        assert_eq!(summary.known, 1);
        let links = feed_links(&storage, "worldbank_jobs.xml");
        assert_eq!(links.len(), 1);
        assert!(links.contains("https://worldbankgroup.csod.com/job/2"));

        let xml = storage.get_string("worldbank_jobs.xml").unwrap();
        assert!(xml.contains(&format!(
            r#"<guid isPermaLink="false">{}</guid>"#,
            numeric_id("https://worldbankgroup.csod.com/job/2")
        )));
    }

    #[tokio::test]
    async fn test_unchanged_listing_yields_zero_new() {
        let config = config(true, DescriptionFormat::Narrative);
        let storage = MemoryStorage::new();
        let renderer = StaticRenderer(listing(&[1, 2, 3]));

        let first = run_scraper(&config, &renderer, &storage, now()).await.unwrap();
        let second = run_scraper(&config, &renderer, &storage, now()).await.unwrap();
        let third = run_scraper(&config, &renderer, &storage, now()).await.unwrap();

        assert_eq!(first.new, 3);
        assert_eq!(second.new, 0);
        // The ledger remembers jobs even after they leave the feed
        assert_eq!(third.new, 0);
        assert_eq!(third.known, 3);
        assert_eq!(storage.ledger("worldbank_seen.json").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_zero_candidates_completes() {
        let page = "<html><body><p>Site maintenance</p></body></html>".to_string();

        let config_a = config(false, DescriptionFormat::Summary);
        let storage = MemoryStorage::new();
        storage.insert("worldbank_jobs.xml", "previous");
        let summary = run_scraper(&config_a, &StaticRenderer(page.clone()), &storage, now())
            .await
            .unwrap();
        assert_eq!(summary.accepted, 0);
        assert_eq!(summary.written_to, None);
        assert_eq!(storage.get_string("worldbank_jobs.xml").as_deref(), Some("previous"));

        let config_b = config(true, DescriptionFormat::Narrative);
        let storage = MemoryStorage::new();
        let summary = run_scraper(&config_b, &StaticRenderer(page), &storage, now())
            .await
            .unwrap();
        assert_eq!(summary.found, 0);
        assert_eq!(summary.published, 0);
        assert!(feed_links(&storage, "worldbank_jobs.xml").is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_leaves_feed_untouched() {
        let config = config(true, DescriptionFormat::Narrative);
        let storage = MemoryStorage::new();
        storage.insert("worldbank_jobs.xml", "previous");

        let err = run_scraper(&config, &BrokenRenderer, &storage, now())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RenderTimeout { .. }));
        assert_eq!(storage.get_string("worldbank_jobs.xml").as_deref(), Some("previous"));
    }

    #[tokio::test]
    async fn test_write_failure_is_fatal() {
        let config = config(false, DescriptionFormat::Summary);
        let storage = MemoryStorage::failing_writes();

        let result = run_scraper(&config, &StaticRenderer(listing(&[1])), &storage, now()).await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_summary_reported_when_write_fails() {
        capture::install();
        let config = config(false, DescriptionFormat::Summary);
        let storage = MemoryStorage::failing_writes();

        let result = run_scraper(&config, &StaticRenderer(listing(&[1, 2])), &storage, now()).await;
        assert!(result.is_err());

        let lines = capture::lines();
        assert!(lines.iter().any(|l| l.starts_with("Feed not written")));
        assert!(lines.iter().any(|l| l == "Summary:"));
        assert!(lines.iter().any(|l| l == "    Accepted:   2"));
        assert!(lines.iter().any(|l| l == "    Feed:       not written"));
    }

    #[tokio::test]
    async fn test_summary_reported_when_render_fails() {
        capture::install();
        let config = config(true, DescriptionFormat::Narrative);

        let result = run_scraper(&config, &BrokenRenderer, &MemoryStorage::new(), now()).await;
        assert!(result.is_err());
        assert!(capture::lines().iter().any(|l| l == "Summary:"));
    }

    #[tokio::test]
    async fn test_stale_ledger_entries_pruned() {
        let mut config = config(true, DescriptionFormat::Narrative);
        config.feed.seen_retention_days = 30;
        let storage = MemoryStorage::new();

        let long_ago = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut ledger = SeenLedger::default();
        ledger.record(
            ["https://worldbankgroup.csod.com/job/old", "https://worldbankgroup.csod.com/job/1"],
            long_ago,
        );
        storage.save_seen("worldbank_seen.json", &ledger).await.unwrap();

        let summary = run_scraper(&config, &StaticRenderer(listing(&[1])), &storage, now())
            .await
            .unwrap();
        assert_eq!(summary.known, 1);

        let ledger = storage.ledger("worldbank_seen.json").unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.entries.contains_key("https://worldbankgroup.csod.com/job/1"));
        assert_eq!(ledger.entries["https://worldbankgroup.csod.com/job/1"].first_seen, long_ago);
    }

    #[tokio::test]
    async fn test_corrupt_previous_feed_degrades() {
        let config = config(true, DescriptionFormat::Narrative);
        let storage = MemoryStorage::new();
        storage.insert("worldbank_jobs.xml", "<rss><channel><item>");

        let summary = run_scraper(&config, &StaticRenderer(listing(&[7])), &storage, now())
            .await
            .unwrap();
        assert_eq!(summary.new, 1);
    }

    #[test]
    fn test_extract_counts_skips() {
        let html = r#"<ul>
            <li class="job-item"><a href="/job/1">Economist II</a></li>
            <li class="job-item"><a href="/search">Search</a></li>
            <li class="job-item"><span>No link at all</span></li>
        </ul>"#;
        let extraction = extract_jobs(&Config::default(), html).unwrap();

        assert_eq!(extraction.processed, 3);
        assert_eq!(extraction.jobs.len(), 1);
        assert_eq!(extraction.skipped(), 2);
        assert_eq!(extraction.jobs[0].title, "Economist II");
    }
}
