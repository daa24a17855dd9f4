//! Index-page traversal
//!
//! The controller walks a paginated listing search one index page at a time:
//!
//! ```text
//! AtIndexPage → EnumeratingListings → AdvancingPage → AtIndexPage
//!                                                   ↘ Exhausted | Failed
//! ```
//!
//! A missing or unusable "next" control, the page bound, a revisited index
//! page, and an index page that fails to load all end traversal as
//! `Exhausted`. Only a session failure ends it as `Failed`.

use crate::config::{Config, SelectorConfig};
use crate::crawler::parser::resolve_link;
use crate::fetch::{FetchError, PageFetcher};
use crate::state::{ExhaustReason, NavState};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Selectors the controller needs from index pages
#[derive(Debug, Clone)]
pub struct NavigationSelectors {
    pub listing_links: String,
    pub next_page: String,
    pub next_page_text: Option<String>,
}

impl From<&SelectorConfig> for NavigationSelectors {
    fn from(config: &SelectorConfig) -> Self {
        Self {
            listing_links: config.listing_links.clone(),
            next_page: config.next_page.clone(),
            next_page_text: config.next_page_text.clone(),
        }
    }
}

/// Drives traversal of paginated index pages
#[derive(Debug)]
pub struct NavigationController {
    state: NavState,
    current: Url,
    page_number: u32,
    pages_loaded: u32,
    max_pages: u32,
    visited: HashSet<String>,
    selectors: NavigationSelectors,
    wait_timeout: Duration,
}

impl NavigationController {
    /// Creates a controller positioned at the entry index page
    pub fn new(
        entry_url: Url,
        max_pages: u32,
        selectors: NavigationSelectors,
        wait_timeout: Duration,
    ) -> Self {
        let mut visited = HashSet::new();
        visited.insert(entry_url.to_string());

        Self {
            state: NavState::AtIndexPage,
            current: entry_url,
            page_number: 1,
            pages_loaded: 0,
            max_pages,
            visited,
            selectors,
            wait_timeout,
        }
    }

    /// Creates a controller for the configured entry page
    pub fn from_config(config: &Config) -> Result<Self, url::ParseError> {
        Ok(Self::new(
            Url::parse(&config.crawl.entry_url)?,
            config.crawl.max_pages,
            NavigationSelectors::from(&config.selectors),
            Duration::from_millis(config.crawl.wait_timeout_ms),
        ))
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// URL of the current index page
    pub fn current_url(&self) -> &Url {
        &self.current
    }

    /// 1-based number of the current index page
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Index pages that actually loaded
    pub fn pages_loaded(&self) -> u32 {
        self.pages_loaded
    }

    /// Loads the current index page and collects its listing URLs
    ///
    /// Returns the URLs in page order with duplicates removed. An index page
    /// without listings yields an empty list; traversal still advances.
    ///
    /// # Returns
    ///
    /// * `Ok(urls)` - Listing URLs (empty if the page had none or failed to load)
    /// * `Err(FetchError)` - The fetch session failed; the state is now `Failed`
    pub async fn discover_listing_urls<F: PageFetcher>(
        &mut self,
        fetcher: &mut F,
    ) -> Result<Vec<Url>, FetchError> {
        if self.state != NavState::AtIndexPage {
            return Ok(Vec::new());
        }

        if !self.open_current(fetcher).await? {
            return Ok(Vec::new());
        }
        self.pages_loaded += 1;

        let waited = fetcher
            .wait_for(&self.selectors.listing_links, self.wait_timeout)
            .await;
        let present = self.guard(waited)?;
        self.state = NavState::EnumeratingListings;

        if present.is_none() {
            tracing::info!("No listings on index page {}", self.page_number);
            return Ok(Vec::new());
        }

        let found = fetcher.find_all(&self.selectors.listing_links).await;
        let links = self.guard(found)?;
        let base = fetcher.current_url().cloned().unwrap_or_else(|| self.current.clone());

        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for link in links {
            let Some(href) = link.attr("href") else {
                tracing::debug!("Listing link without href on page {}", self.page_number);
                continue;
            };
            match resolve_link(&href, &base) {
                Some(url) if seen.insert(url.to_string()) => urls.push(url),
                Some(_) => {}
                None => tracing::debug!("Skipping unusable listing link '{}'", href),
            }
        }

        tracing::info!(
            "Found {} listings on index page {}",
            urls.len(),
            self.page_number
        );
        Ok(urls)
    }

    /// Moves to the next index page, or ends traversal
    ///
    /// The current index page is reopened first, since listing extraction
    /// navigates away from it.
    ///
    /// # Returns
    ///
    /// * `Ok(NavState::AtIndexPage)` - Positioned at the next index page
    /// * `Ok(NavState::Exhausted(_))` - Traversal is over
    /// * `Err(FetchError)` - The fetch session failed; the state is now `Failed`
    pub async fn advance<F: PageFetcher>(&mut self, fetcher: &mut F) -> Result<NavState, FetchError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        self.state = NavState::AdvancingPage;

        if self.page_number >= self.max_pages {
            tracing::info!("Reached page bound of {} index pages", self.max_pages);
            return Ok(self.exhaust(ExhaustReason::PageBound));
        }

        if !self.open_current(fetcher).await? {
            return Ok(self.state);
        }

        let Some(next) = self.find_next_page(fetcher).await? else {
            tracing::info!("No more pages to scrape after page {}", self.page_number);
            return Ok(self.exhaust(ExhaustReason::NoNextControl));
        };

        if !self.visited.insert(next.to_string()) {
            tracing::warn!("Next page {} was already visited, stopping", next);
            return Ok(self.exhaust(ExhaustReason::Loop));
        }

        self.page_number += 1;
        self.current = next;
        self.state = NavState::AtIndexPage;
        tracing::info!("Advancing to index page {}: {}", self.page_number, self.current);

        Ok(self.state)
    }

    /// Resolves the href of the first matching "next" control
    async fn find_next_page<F: PageFetcher>(
        &mut self,
        fetcher: &mut F,
    ) -> Result<Option<Url>, FetchError> {
        let waited = fetcher
            .wait_for(&self.selectors.next_page, self.wait_timeout)
            .await;
        let present = self.guard(waited)?;
        if present.is_none() {
            return Ok(None);
        }

        let found = fetcher.find_all(&self.selectors.next_page).await;
        let candidates = self.guard(found)?;
        let base = fetcher.current_url().cloned().unwrap_or_else(|| self.current.clone());

        let control = candidates.into_iter().find(|candidate| {
            self.selectors
                .next_page_text
                .as_deref()
                .map_or(true, |label| candidate.text().contains(label))
        });

        // A control without a usable href is treated as detached
        Ok(control
            .and_then(|control| control.attr("href"))
            .and_then(|href| resolve_link(&href, &base)))
    }

    /// Loads the current index page
    ///
    /// Returns false (with the state set to `Exhausted`) when the page fails
    /// to load without taking the session down.
    async fn open_current<F: PageFetcher>(&mut self, fetcher: &mut F) -> Result<bool, FetchError> {
        match fetcher.goto(&self.current).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_fatal() => {
                self.state = NavState::Failed;
                Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    "Index page {} could not be loaded, stopping: {}",
                    self.page_number,
                    e
                );
                self.exhaust(ExhaustReason::NavigationFailure);
                Ok(false)
            }
        }
    }

    /// Marks the controller failed when a query error escapes
    fn guard<T>(&mut self, result: Result<T, FetchError>) -> Result<T, FetchError> {
        if result.is_err() {
            self.state = NavState::Failed;
        }
        result
    }

    fn exhaust(&mut self, reason: ExhaustReason) -> NavState {
        self.state = NavState::Exhausted(reason);
        self.state
    }
}
