//! Run report produced at the end of a crawl

use crate::state::{CrawlState, NavState, RunStats};
use chrono::{DateTime, Utc};

/// Summary of one completed crawl run
#[derive(Debug, Clone)]
pub struct RunReport {
    // Run metadata
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub termination: NavState,

    // Traversal
    /// Index pages that loaded; a failed entry page counts as none
    pub pages_visited: u32,

    // Counters
    pub stats: RunStats,

    /// Rows appended to the store by this run
    pub rows_written: usize,
}

impl RunReport {
    /// Builds the report from a finished run's state
    pub fn from_state(state: &CrawlState, rows_written: usize) -> Self {
        Self {
            started_at: state.started_at,
            finished_at: Utc::now(),
            termination: state.navigation.state(),
            pages_visited: state.navigation.pages_loaded(),
            stats: state.stats.clone(),
            rows_written,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Prints a run report to stdout
pub fn print_run_report(report: &RunReport) {
    println!("=== Crawl Report ===\n");

    println!("Run:");
    println!("  Started: {}", report.started_at.to_rfc3339());
    println!("  Finished: {}", report.finished_at.to_rfc3339());
    println!("  Duration: {}s", report.duration_seconds());
    println!("  Termination: {}", report.termination);
    println!();

    println!("Results:");
    println!("  Index pages visited: {}", report.pages_visited);
    println!("  Listings discovered: {}", report.stats.listings_discovered);
    println!("  Listings failed: {}", report.stats.listings_failed);
    println!("  Records staged: {}", report.stats.records_staged);
    println!("  Rows written: {}", report.rows_written);
    println!("  Field misses: {}", report.stats.field_misses);
    println!();

    if !report.stats.dropped_keys.is_empty() {
        println!("Labels Outside the Schema ({}):", report.stats.dropped_keys.len());
        let mut dropped: Vec<_> = report.stats.dropped_keys.iter().collect();
        dropped.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (label, count) in dropped {
            println!("  - {} ({})", label, count);
        }
    }
}
