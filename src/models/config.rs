//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::DescriptionFormat;
use crate::utils::url::origin_of;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Target careers site
    #[serde(default)]
    pub site: SiteConfig,

    /// Rendering and settle timings
    #[serde(default)]
    pub render: RenderConfig,

    /// Candidate location and field extraction rules
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Feed output settings
    #[serde(default)]
    pub feed: FeedConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.site.url)?;
        url::Url::parse(&self.site.origin)?;
        if origin_of(&self.site.origin).as_deref() != Some(self.site.origin.trim_end_matches('/')) {
            return Err(AppError::validation(
                "site.origin must be scheme and host only, without a path",
            ));
        }
        url::Url::parse(&self.site.listing_base)?;

        if self.render.user_agent.trim().is_empty() {
            return Err(AppError::validation("render.user_agent is empty"));
        }
        if self.render.timeout_secs == 0 {
            return Err(AppError::validation("render.timeout_secs must be > 0"));
        }
        if self.render.timeout_secs <= self.render.total_settle().as_secs() {
            return Err(AppError::validation(
                "render.timeout_secs must exceed the total settle delay",
            ));
        }
        if self.extraction.candidate_cap == 0 {
            return Err(AppError::validation("extraction.candidate_cap must be > 0"));
        }
        if self.extraction.class_keywords.is_empty() {
            return Err(AppError::validation("No class keywords defined"));
        }
        if self.extraction.default_location.trim().is_empty() {
            return Err(AppError::validation("extraction.default_location is empty"));
        }
        if self.feed.output_path.trim().is_empty() {
            return Err(AppError::validation("feed.output_path is empty"));
        }
        if self.feed.title.trim().is_empty() {
            return Err(AppError::validation("feed.title is empty"));
        }
        Ok(())
    }
}

/// Careers site addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Careers listing page to render
    #[serde(default = "defaults::site_url")]
    pub url: String,

    /// Scheme and host prefixed to root-relative links
    #[serde(default = "defaults::origin")]
    pub origin: String,

    /// Base path prefixed to bare relative links
    #[serde(default = "defaults::listing_base")]
    pub listing_base: String,

    /// Organization name used in narrative descriptions
    #[serde(default = "defaults::organization")]
    pub organization: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: defaults::site_url(),
            origin: defaults::origin(),
            listing_base: defaults::listing_base(),
            organization: defaults::organization(),
        }
    }
}

/// Timings and browser settings for the render step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Wait after navigation for client-side rendering
    #[serde(default = "defaults::settle_secs")]
    pub settle_secs: u64,

    /// Wait after scrolling to the bottom for lazy-loaded content
    #[serde(default = "defaults::scroll_settle_secs")]
    pub scroll_settle_secs: u64,

    /// Wait after scrolling back to the top
    #[serde(default = "defaults::return_settle_secs")]
    pub return_settle_secs: u64,

    /// Upper bound for the whole render step
    #[serde(default = "defaults::render_timeout")]
    pub timeout_secs: u64,

    /// User-Agent presented by the browser or HTTP client
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    #[serde(default = "defaults::window_width")]
    pub window_width: u32,

    #[serde(default = "defaults::window_height")]
    pub window_height: u32,
}

impl RenderConfig {
    /// Sum of all settle delays.
    pub fn total_settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs + self.scroll_settle_secs + self.return_settle_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            settle_secs: defaults::settle_secs(),
            scroll_settle_secs: defaults::scroll_settle_secs(),
            return_settle_secs: defaults::return_settle_secs(),
            timeout_secs: defaults::render_timeout(),
            user_agent: defaults::user_agent(),
            window_width: defaults::window_width(),
            window_height: defaults::window_height(),
        }
    }
}

/// Keyword lists and limits that drive candidate location and normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Class substrings marking a job container
    #[serde(default = "defaults::class_keywords")]
    pub class_keywords: Vec<String>,

    /// Href substring marking a job posting link
    #[serde(default = "defaults::link_keyword")]
    pub link_keyword: String,

    /// Link text must be longer than this to count as a posting
    #[serde(default = "defaults::min_link_text_len")]
    pub min_link_text_len: usize,

    /// Maximum candidates processed per run
    #[serde(default = "defaults::candidate_cap")]
    pub candidate_cap: usize,

    /// Generic navigation terms rejected as titles
    #[serde(default = "defaults::stoplist")]
    pub stoplist: Vec<String>,

    /// Literal text cues identifying a location
    #[serde(default = "defaults::location_cues")]
    pub location_cues: Vec<String>,

    #[serde(default = "defaults::default_location")]
    pub default_location: String,

    #[serde(default = "defaults::min_title_len")]
    pub min_title_len: usize,

    /// Truncation length when the title falls back to the fragment text
    #[serde(default = "defaults::max_fallback_title_len")]
    pub max_fallback_title_len: usize,
}

impl ExtractionConfig {
    /// Whether the title contains a stoplisted term (case-insensitive).
    pub fn is_stoplisted(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        self.stoplist
            .iter()
            .any(|term| lower.contains(&term.to_lowercase()))
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            class_keywords: defaults::class_keywords(),
            link_keyword: defaults::link_keyword(),
            min_link_text_len: defaults::min_link_text_len(),
            candidate_cap: defaults::candidate_cap(),
            stoplist: defaults::stoplist(),
            location_cues: defaults::location_cues(),
            default_location: defaults::default_location(),
            min_title_len: defaults::min_title_len(),
            max_fallback_title_len: defaults::max_fallback_title_len(),
        }
    }
}

/// Feed output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Where the feed is read from and written to
    #[serde(default = "defaults::output_path")]
    pub output_path: String,

    /// Ledger of every link discovered so far
    #[serde(default = "defaults::seen_path")]
    pub seen_path: String,

    /// Days a link stays in the ledger after it was last seen; 0 keeps it forever
    #[serde(default = "defaults::seen_retention_days")]
    pub seen_retention_days: u32,

    /// Publish only jobs not seen by a previous run
    #[serde(default = "defaults::dedup_enabled")]
    pub dedup_enabled: bool,

    #[serde(default)]
    pub description_format: DescriptionFormat,

    #[serde(default = "defaults::feed_title")]
    pub title: String,

    #[serde(default = "defaults::feed_description")]
    pub description: String,

    #[serde(default = "defaults::language")]
    pub language: String,

    /// Public URL of the feed itself, emitted as `atom:link rel="self"`
    #[serde(default = "defaults::self_link")]
    pub self_link: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            output_path: defaults::output_path(),
            seen_path: defaults::seen_path(),
            seen_retention_days: defaults::seen_retention_days(),
            dedup_enabled: defaults::dedup_enabled(),
            description_format: DescriptionFormat::default(),
            title: defaults::feed_title(),
            description: defaults::feed_description(),
            language: defaults::language(),
            self_link: defaults::self_link(),
        }
    }
}

impl FeedConfig {
    /// How long unseen links are remembered, `None` for forever.
    pub fn seen_retention(&self) -> Option<chrono::Duration> {
        (self.seen_retention_days > 0).then(|| chrono::Duration::days(i64::from(self.seen_retention_days)))
    }
}

mod defaults {
    // Site defaults
    pub fn site_url() -> String {
        "https://worldbankgroup.csod.com/ux/ats/careersite/1/home?c=worldbankgroup".into()
    }
    pub fn origin() -> String {
        "https://worldbankgroup.csod.com".into()
    }
    pub fn listing_base() -> String {
        "https://worldbankgroup.csod.com/ux/ats/careersite/1/".into()
    }
    pub fn organization() -> String {
        "World Bank Group".into()
    }

    // Render defaults
    pub fn settle_secs() -> u64 {
        20
    }
    pub fn scroll_settle_secs() -> u64 {
        3
    }
    pub fn return_settle_secs() -> u64 {
        2
    }
    pub fn render_timeout() -> u64 {
        120
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into()
    }
    pub fn window_width() -> u32 {
        1920
    }
    pub fn window_height() -> u32 {
        1080
    }

    // Extraction defaults
    pub fn class_keywords() -> Vec<String> {
        vec![
            "job-card".into(),
            "job-item".into(),
            "position".into(),
            "vacancy".into(),
            "requisition".into(),
        ]
    }
    pub fn link_keyword() -> String {
        "requisition".into()
    }
    pub fn min_link_text_len() -> usize {
        5
    }
    pub fn candidate_cap() -> usize {
        50
    }
    pub fn stoplist() -> Vec<String> {
        vec![
            "search".into(),
            "filter".into(),
            "sort".into(),
            "login".into(),
            "sign in".into(),
            "home".into(),
            "about".into(),
            "contact".into(),
        ]
    }
    pub fn location_cues() -> Vec<String> {
        vec![
            "Washington".into(),
            "DC".into(),
            "Remote".into(),
            "Location:".into(),
        ]
    }
    pub fn default_location() -> String {
        "World Bank Group".into()
    }
    pub fn min_title_len() -> usize {
        5
    }
    pub fn max_fallback_title_len() -> usize {
        100
    }

    // Feed defaults
    pub fn output_path() -> String {
        "worldbank_jobs.xml".into()
    }
    pub fn seen_path() -> String {
        "worldbank_seen.json".into()
    }
    pub fn seen_retention_days() -> u32 {
        180
    }
    pub fn dedup_enabled() -> bool {
        true
    }
    pub fn feed_title() -> String {
        "World Bank Group Jobs".into()
    }
    pub fn feed_description() -> String {
        "Job listings from World Bank Group".into()
    }
    pub fn language() -> String {
        "en-us".into()
    }
    pub fn self_link() -> Option<String> {
        Some("https://cinfoposte.github.io/worldbank-jobs/worldbank_jobs.xml".into())
    }
}
