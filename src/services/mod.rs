//! Service layer for the scraper.
//!
//! This module contains the business logic for:
//! - Page rendering (`Renderer` and its backends)
//! - Candidate location (`CandidateLocator`)
//! - Record normalization (`RecordNormalizer`)
//! - RSS encoding and decoding (`feed`)

pub mod feed;
mod locator;
mod normalizer;
mod render;

pub use locator::{CandidateLocator, Located, Strategy};
pub use normalizer::RecordNormalizer;
#[cfg(feature = "browser")]
pub use render::ChromeRenderer;
pub use render::{FileRenderer, HttpRenderer, Renderer};
