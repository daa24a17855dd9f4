//! Crawler module for listing traversal and extraction
//!
//! This module contains the core crawling logic, including:
//! - Index-page traversal and pagination
//! - Best-effort extraction of listing detail pages
//! - Text cleanup and link resolution
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod navigation;
mod parser;

pub use coordinator::Coordinator;
pub use extractor::{ExtractError, Extraction, ListingExtractor, Probe, URL_FIELD};
pub use navigation::{NavigationController, NavigationSelectors};
pub use parser::{clean_text, normalize_nbsp, resolve_link};

use crate::config::{Config, OutputConfig};
use crate::fetch::PageFetcher;
use crate::output::RunReport;
use crate::schema::{AliasTable, Schema};
use crate::storage::CsvStorage;
use crate::CrawlError;
use std::path::Path;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Resolve the entry URL and load the alias table
/// 2. Open the record store and verify its header
/// 3. Walk index pages and extract every listing
/// 4. Flush the collected records and close the fetch session
///
/// The fetch session is closed on every path, including setup failures.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fetcher` - An open fetch session, owned by the run from here on
///
/// # Returns
///
/// * `Ok(RunReport)` - Crawl completed successfully
/// * `Err(CrawlError)` - Crawl failed
pub async fn run_crawl<F: PageFetcher>(
    config: &Config,
    mut fetcher: F,
) -> Result<RunReport, CrawlError> {
    let (navigation, aliases, storage) = match prepare_run(config) {
        Ok(setup) => setup,
        Err(e) => {
            if let Err(close_err) = fetcher.close().await {
                tracing::warn!("Failed to close fetch session: {}", close_err);
            }
            return Err(e);
        }
    };

    Coordinator::new(config, navigation, fetcher, storage, aliases)
        .run()
        .await
}

/// Builds everything a run needs besides the fetch session
fn prepare_run(
    config: &Config,
) -> Result<(NavigationController, AliasTable, CsvStorage), CrawlError> {
    let navigation = NavigationController::from_config(config)?;
    let schema = Schema::listing();
    let aliases = load_aliases(&config.output, &schema)?;
    let storage = CsvStorage::open(
        &config.output.store_path,
        schema,
        &config.output.null_marker,
    )?;
    Ok((navigation, aliases, storage))
}

/// Loads the configured alias table, or an empty one
pub fn load_aliases(output: &OutputConfig, schema: &Schema) -> Result<AliasTable, CrawlError> {
    let Some(path) = &output.alias_path else {
        tracing::info!("No alias table configured; labels are matched verbatim");
        return Ok(AliasTable::empty());
    };

    let aliases = AliasTable::load(Path::new(path), schema)?;
    tracing::info!(
        "Loaded {} aliases from {} (version {}, sha256 {})",
        aliases.len(),
        path,
        aliases.version(),
        aliases.fingerprint()
    );
    Ok(aliases)
}
