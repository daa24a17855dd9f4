//! State module for tracking crawl progress
//!
//! This module provides state management for one crawl run.
//!
//! # Components
//!
//! - `NavState`: Tracks where index-page traversal stands (and why it stopped)
//! - `CrawlState`: Holds the traversal position, staged records, and counters
//! - `RunStats`: Counters accumulated over a run

mod crawl_state;
mod nav_state;

// Re-export main types
pub use crawl_state::{CrawlState, RunStats};
pub use nav_state::{ExhaustReason, NavState};
