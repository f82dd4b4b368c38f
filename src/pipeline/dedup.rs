//! Deduplication against previously published jobs.
//!
//! Identity is derived from the canonical link only, so the same posting is
//! recognised across runs and processes.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::models::JobRecord;

/// Numeric identities are reduced into this range (8 digits).
const ID_MODULUS: u64 = 100_000_000;

/// Stable 8-digit numeric identity of a link.
///
/// The first 8 hex digits of the SHA-256 of the link, read as an integer and
/// reduced modulo 10^8, zero-padded.
pub fn numeric_id(link: &str) -> String {
    let digest = hex::encode(Sha256::digest(link.as_bytes()));
    // 8 hex digits always fit in a u64
    let head = u64::from_str_radix(&digest[..8], 16).unwrap_or_default();
    format!("{:08}", head % ID_MODULUS)
}

/// Result of partitioning a run's jobs against known identities.
#[derive(Debug, Clone, Default)]
pub struct DedupResult {
    /// Jobs whose link was not previously known, in discovery order
    pub new: Vec<JobRecord>,
    /// Jobs already published, in discovery order
    pub known: Vec<JobRecord>,
    /// Repeated links within this run that were dropped
    pub duplicates: usize,
}

impl DedupResult {
    pub fn has_new(&self) -> bool {
        !self.new.is_empty()
    }

    /// Number of distinct jobs in the run.
    pub fn total(&self) -> usize {
        self.new.len() + self.known.len()
    }
}

/// Partitions jobs into new and known.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    known: HashSet<String>,
}

impl Deduplicator {
    /// Create a deduplicator from previously seen links.
    pub fn new(known: HashSet<String>) -> Self {
        Self { known }
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// Partition `jobs`, preserving relative order and collapsing repeats.
    pub fn partition(&self, jobs: Vec<JobRecord>) -> DedupResult {
        let mut seen_this_run = HashSet::new();
        let mut result = DedupResult::default();

        for job in jobs {
            if !seen_this_run.insert(job.link.clone()) {
                result.duplicates += 1;
                continue;
            }
            if self.known.contains(&job.link) {
                result.known.push(job);
            } else {
                result.new.push(job);
            }
        }
        result
    }
}
