//! Output module for run reports and store statistics
//!
//! This module handles:
//! - Summarizing a finished crawl run
//! - Reading completeness statistics back from the record store

mod report;
pub mod stats;

pub use report::{print_run_report, RunReport};
pub use stats::{load_store_statistics, print_store_statistics, StoreStatistics};
