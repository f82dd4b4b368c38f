//! Pipeline entry points for scraper operations.
//!
//! - `run_scraper`: Render the careers page and publish new jobs as RSS
//! - `dedup`: Link identity and new/known partitioning

pub mod dedup;
pub mod run;

pub use dedup::{DedupResult, Deduplicator, numeric_id};
pub use run::{RunSummary, extract_jobs, run_scraper};
