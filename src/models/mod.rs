// src/models/mod.rs

//! Domain models for the scraper.

mod config;
mod job;

// Re-export all public types
pub use config::{Config, ExtractionConfig, FeedConfig, RenderConfig, SiteConfig};
pub use job::{DescriptionContext, DescriptionFormat, JobRecord};
