//! Configuration module for the listing crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use listing_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config/crawler.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.crawl.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, FetcherConfig, FieldProbe, OutputConfig, SelectorConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
