//! Listing-Crawler: a classifieds listing harvester
//!
//! This crate walks paginated index pages of a classifieds site, extracts the
//! free-text attributes of every listing it finds, and reconciles them into a
//! fixed tabular schema appended to a CSV store.

pub mod config;
pub mod crawler;
pub mod fetch;
pub mod output;
pub mod schema;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch session error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator};
pub use fetch::{HttpFetcher, PageFetcher};
pub use output::RunReport;
pub use schema::{reconcile, AliasTable, CanonicalRecord, Cell, RawAttributeMap, Schema};
pub use state::{ExhaustReason, NavState};
pub use storage::{CsvStorage, Storage};
