//! HTTP page fetcher
//!
//! Loads pages with a plain GET and answers element queries against the
//! returned markup. A fetched document never changes after it arrives, so
//! presence waits resolve as soon as the document is checked once.

use crate::config::FetcherConfig;
use crate::fetch::snapshot::parse_selector;
use crate::fetch::{ElementSnapshot, FetchError, FetchResult, PageFetcher};
use reqwest::Client;
use scraper::Html;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Cloneable handle that can close a fetch session from another task
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    closed: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the session; the next fetcher operation fails
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A page loaded into the fetcher
#[derive(Debug)]
struct LoadedPage {
    url: Url,
    body: String,
}

/// `PageFetcher` backed by reqwest and scraper
pub struct HttpFetcher {
    client: Client,
    page: Option<LoadedPage>,
    session: SessionHandle,
}

/// Builds an HTTP client with the configured user agent and timeouts
///
/// # Example
///
/// ```no_run
/// use listing_crawler::config::FetcherConfig;
/// use listing_crawler::fetch::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            page: None,
            session: SessionHandle::new(),
        }
    }

    /// Handle for closing this session from outside the crawl
    pub fn session_handle(&self) -> SessionHandle {
        self.session.clone()
    }

    fn ensure_open(&self) -> FetchResult<()> {
        if self.session.is_closed() {
            Err(FetchError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn loaded(&self) -> FetchResult<&LoadedPage> {
        self.ensure_open()?;
        self.page.as_ref().ok_or(FetchError::NoPage)
    }
}

impl PageFetcher for HttpFetcher {
    async fn goto(&mut self, url: &Url) -> FetchResult<()> {
        self.ensure_open()?;
        tracing::debug!("GET {}", url);

        // The previous page is gone whether or not this load succeeds
        self.page = None;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        // A close that raced the request wins
        self.ensure_open()?;
        self.page = Some(LoadedPage {
            url: final_url,
            body,
        });
        Ok(())
    }

    fn current_url(&self) -> Option<&Url> {
        self.page.as_ref().map(|page| &page.url)
    }

    async fn find_all(&mut self, selector: &str) -> FetchResult<Vec<ElementSnapshot>> {
        let page = self.loaded()?;
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&page.body);

        Ok(document
            .select(&selector)
            .map(ElementSnapshot::from_element)
            .collect())
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> FetchResult<Option<ElementSnapshot>> {
        self.find_first(selector).await
    }

    async fn close(&mut self) -> FetchResult<()> {
        self.page = None;
        self.session.close();
        tracing::debug!("Fetch session closed");
        Ok(())
    }
}

fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    let reason = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    };

    FetchError::Unreachable {
        url: url.to_string(),
        reason,
    }
}
