//! Run-scoped crawl state

use crate::crawler::NavigationController;
use crate::schema::CanonicalRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Counters accumulated over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Listing URLs handed out by index pages
    pub listings_discovered: u64,

    /// Listings dropped after an extraction failure
    pub listings_failed: u64,

    /// Records reconciled and staged for the store
    pub records_staged: u64,

    /// Field probes and scans that found nothing
    pub field_misses: u64,

    /// Labels dropped by reconciliation, with occurrence counts
    pub dropped_keys: BTreeMap<String, u64>,
}

impl RunStats {
    pub fn record_dropped_keys(&mut self, keys: &[String]) {
        for key in keys {
            *self.dropped_keys.entry(key.clone()).or_insert(0) += 1;
        }
    }
}

/// State of one crawl run
///
/// Created at run start, owned by the coordinator, and consumed when the
/// staged records are flushed.
pub struct CrawlState {
    /// Current position in the index-page traversal
    pub navigation: NavigationController,

    /// Reconciled records in discovery order
    pub staged: Vec<CanonicalRecord>,

    pub stats: RunStats,

    pub started_at: DateTime<Utc>,
}

impl CrawlState {
    pub fn new(navigation: NavigationController) -> Self {
        Self {
            navigation,
            staged: Vec::new(),
            stats: RunStats::default(),
            started_at: Utc::now(),
        }
    }

    /// Appends a record behind everything staged so far
    pub fn stage(&mut self, record: CanonicalRecord) {
        self.staged.push(record);
        self.stats.records_staged += 1;
    }

    /// Removes the staged records for flushing
    pub fn take_staged(&mut self) -> Vec<CanonicalRecord> {
        std::mem::take(&mut self.staged)
    }
}
