//! Storage abstractions for feed persistence.
//!
//! ## Layout
//!
//! ```text
//! {root}/
//! ├── config.toml            # Scraper configuration
//! ├── worldbank_jobs.xml     # Last published RSS feed
//! └── worldbank_seen.json    # Every link discovered so far
//! ```

pub mod local;
pub mod memory;

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// When a link was first and most recently discovered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeenEntry {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Links discovered by earlier runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeenLedger {
    /// ISO 8601 timestamp of last update
    pub updated_at: Option<DateTime<Utc>>,
    pub entries: BTreeMap<String, SeenEntry>,
}

impl SeenLedger {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn links(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Record links seen at `at`, keeping earlier first-seen times.
    /// Returns how many links were not recorded before.
    pub fn record<'a>(&mut self, links: impl IntoIterator<Item = &'a str>, at: DateTime<Utc>) -> usize {
        let mut added = 0;
        for link in links {
            match self.entries.get_mut(link) {
                Some(entry) => entry.last_seen = entry.last_seen.max(at),
                None => {
                    self.entries.insert(
                        link.to_string(),
                        SeenEntry {
                            first_seen: at,
                            last_seen: at,
                        },
                    );
                    added += 1;
                }
            }
        }
        self.updated_at = Some(at);
        added
    }

    /// Drop links last seen before `cutoff`. Returns how many were dropped.
    pub fn prune(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_seen >= cutoff);
        before - self.entries.len()
    }
}

/// Trait for feed storage backends.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Read a feed document, `None` if it does not exist.
    async fn read_feed(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace a feed document in one step.
    async fn write_feed(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Load the seen ledger, empty if it does not exist.
    async fn load_seen(&self, key: &str) -> Result<SeenLedger>;

    /// Persist the seen ledger.
    async fn save_seen(&self, key: &str, ledger: &SeenLedger) -> Result<()>;
}

/// Load the seen ledger, treating an unreadable one as empty.
pub async fn load_seen_or_empty(storage: &dyn FeedStore, key: &str) -> SeenLedger {
    match storage.load_seen(key).await {
        Ok(ledger) => ledger,
        Err(e) => {
            log::warn!("Seen ledger is unreadable, starting fresh: {e}");
            SeenLedger::default()
        }
    }
}
