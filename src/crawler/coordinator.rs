//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that composes one run:
//! - Walking index pages through the navigation controller
//! - Extracting and reconciling every discovered listing
//! - Staging records in discovery order
//! - Flushing the staged records and releasing the fetch session on every
//!   exit path

use crate::config::Config;
use crate::crawler::{ListingExtractor, NavigationController};
use crate::fetch::{FetchError, PageFetcher};
use crate::output::RunReport;
use crate::schema::{reconcile, AliasTable, Schema};
use crate::state::CrawlState;
use crate::storage::Storage;
use crate::CrawlError;
use std::time::Duration;
use url::Url;

/// Main crawler coordinator structure
///
/// Owns the fetch session and the store for the whole run. Both are released
/// by `run`, whatever way the run ends.
pub struct Coordinator<F: PageFetcher, S: Storage> {
    fetcher: F,
    storage: S,
    schema: Schema,
    aliases: AliasTable,
    extractor: ListingExtractor,
    state: CrawlState,
    request_delay: Duration,
    max_pages: u32,
}

impl<F: PageFetcher, S: Storage> Coordinator<F, S> {
    /// Creates a new coordinator instance
    ///
    /// Records are reconciled against the store's schema. Construction cannot
    /// fail; a session handed to a coordinator is always released by `run`.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `navigation` - Controller positioned at the entry index page
    /// * `fetcher` - An open fetch session
    /// * `storage` - An opened record store
    /// * `aliases` - Label aliases applied before reconciliation
    pub fn new(
        config: &Config,
        navigation: NavigationController,
        fetcher: F,
        storage: S,
        aliases: AliasTable,
    ) -> Self {
        let wait_timeout = Duration::from_millis(config.crawl.wait_timeout_ms);
        let extractor = ListingExtractor::new(config.selectors.clone(), wait_timeout);

        Self {
            fetcher,
            schema: storage.schema().clone(),
            storage,
            aliases,
            extractor,
            state: CrawlState::new(navigation),
            request_delay: Duration::from_millis(config.crawl.request_delay_ms),
            max_pages: config.crawl.max_pages,
        }
    }

    /// Runs the crawl to completion
    ///
    /// Staged records are flushed and the fetch session is closed before this
    /// returns, including when the session fails mid-run.
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - Traversal ended normally and every record was flushed
    /// * `Err(CrawlError)` - The session failed or the flush failed
    pub async fn run(mut self) -> Result<RunReport, CrawlError> {
        tracing::info!(
            "Starting crawl at {} (max {} index pages)",
            self.state.navigation.current_url(),
            self.max_pages
        );

        let outcome = self.crawl().await;

        let staged = self.state.take_staged();
        let flushed = self.storage.append(&staged);
        match &flushed {
            Ok(rows) => tracing::info!("Flushed {} records to the store", rows),
            Err(e) => tracing::error!("Failed to flush {} staged records: {}", staged.len(), e),
        }

        if let Err(e) = self.fetcher.close().await {
            tracing::warn!("Failed to close fetch session: {}", e);
        }

        if let Err(e) = outcome {
            tracing::error!("Crawl aborted: {}", e);
            return Err(e.into());
        }
        let rows_written = flushed?;

        let report = RunReport::from_state(&self.state, rows_written);
        tracing::info!(
            "Crawl completed: {} index pages, {} listings discovered, {} records written, {} listings failed ({})",
            report.pages_visited,
            report.stats.listings_discovered,
            report.rows_written,
            report.stats.listings_failed,
            report.termination
        );
        Ok(report)
    }

    /// Walks index pages until traversal ends
    ///
    /// Only a fatal session error escapes; everything else is handled per
    /// listing or per page.
    async fn crawl(&mut self) -> Result<(), FetchError> {
        while !self.state.navigation.is_terminal() {
            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            tracing::info!(
                "Scraping index page {}: {}",
                self.state.navigation.page_number(),
                self.state.navigation.current_url()
            );
            let urls = self
                .state
                .navigation
                .discover_listing_urls(&mut self.fetcher)
                .await?;
            self.state.stats.listings_discovered += urls.len() as u64;

            for url in &urls {
                self.process_listing(url).await?;
            }

            self.state.navigation.advance(&mut self.fetcher).await?;
        }
        Ok(())
    }

    /// Extracts, reconciles and stages one listing
    async fn process_listing(&mut self, url: &Url) -> Result<(), FetchError> {
        let extraction = match self.extractor.extract(&mut self.fetcher, url).await {
            Ok(extraction) => extraction,
            Err(e) if e.is_fatal() => return Err(e.source),
            Err(e) => {
                tracing::error!("{}", e);
                self.state.stats.listings_failed += 1;
                return Ok(());
            }
        };
        self.state.stats.field_misses += extraction.misses.len() as u64;

        let reconciled = reconcile(&extraction.attributes, &self.schema, &self.aliases);
        if !reconciled.dropped_keys.is_empty() {
            tracing::info!(
                "Dropped labels outside the schema on {}: {}",
                url,
                reconciled.dropped_keys.join(", ")
            );
            self.state.stats.record_dropped_keys(&reconciled.dropped_keys);
        }

        self.state.stage(reconciled.record);
        Ok(())
    }
}
