//! Page fetch boundary
//!
//! The crawler never talks to a browser or HTTP client directly; it drives a
//! `PageFetcher`, which owns one page context and answers element queries
//! against whatever page it currently shows. This module contains:
//! - The `PageFetcher` trait and its error taxonomy
//! - `ElementSnapshot`, an owned copy of one element's markup
//! - `HttpFetcher`, a reqwest + scraper implementation over static HTML
//! - `SessionHandle`, for closing a session from outside the crawl loop

mod http;
#[cfg(test)]
pub(crate) mod memory;
mod snapshot;

pub use http::{build_http_client, HttpFetcher, SessionHandle};
pub use snapshot::ElementSnapshot;

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

/// Interval between presence checks while waiting for an element
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors raised by a page fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Page unreachable: {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Fetch session is closed")]
    SessionClosed,

    #[error("No page loaded")]
    NoPage,

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
}

impl FetchError {
    /// Returns true if the session can no longer be used
    ///
    /// Unreachable pages and error statuses only affect the page being
    /// loaded; everything else means the page context itself is gone.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Unreachable { .. } | Self::Status { .. })
    }
}

/// Result type alias for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// A single page context the crawler navigates and queries
///
/// Implementations are used from one task at a time; no two operations run
/// concurrently.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    /// Loads `url` into the page context
    async fn goto(&mut self, url: &Url) -> FetchResult<()>;

    /// URL of the page currently loaded, after redirects
    fn current_url(&self) -> Option<&Url>;

    /// All elements currently matching `selector`, in document order
    async fn find_all(&mut self, selector: &str) -> FetchResult<Vec<ElementSnapshot>>;

    /// First element currently matching `selector`
    async fn find_first(&mut self, selector: &str) -> FetchResult<Option<ElementSnapshot>> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }

    /// Waits up to `timeout` for an element matching `selector`
    ///
    /// Resolves to `None` once the timeout elapses; an absent element is
    /// never an error.
    async fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> FetchResult<Option<ElementSnapshot>> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(element) = self.find_first(selector).await? {
                return Ok(Some(element));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Releases the page context; later operations fail with `SessionClosed`
    async fn close(&mut self) -> FetchResult<()>;
}
