//! In-memory `PageFetcher` for unit tests

use crate::fetch::snapshot::parse_selector;
use crate::fetch::{ElementSnapshot, FetchError, FetchResult, PageFetcher};
use scraper::Html;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Serves pages from a URL → HTML map and records every navigation
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, String>,
    unreachable: HashSet<String>,
    fatal: HashSet<String>,
    current: Option<(Url, String)>,
    pub visits: Vec<String>,

    /// Session is dead; every call fails
    closed: bool,

    /// Set by `close`, observable after the fetcher is moved away
    released: Arc<AtomicBool>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Loading `url` fails with a page-level error
    pub fn with_unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    /// Loading `url` kills the session
    pub fn with_fatal(mut self, url: &str) -> Self {
        self.fatal.insert(url.to_string());
        self
    }

    /// Shared flag that turns true once `close` has been called
    pub fn release_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl PageFetcher for MemoryFetcher {
    async fn goto(&mut self, url: &Url) -> FetchResult<()> {
        if self.closed {
            return Err(FetchError::SessionClosed);
        }
        self.visits.push(url.to_string());
        self.current = None;

        if self.fatal.contains(url.as_str()) {
            self.closed = true;
            return Err(FetchError::SessionClosed);
        }
        if self.unreachable.contains(url.as_str()) {
            return Err(FetchError::Unreachable {
                url: url.to_string(),
                reason: "Connection refused".to_string(),
            });
        }

        match self.pages.get(url.as_str()) {
            Some(html) => {
                self.current = Some((url.clone(), html.clone()));
                Ok(())
            }
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    fn current_url(&self) -> Option<&Url> {
        self.current.as_ref().map(|(url, _)| url)
    }

    async fn find_all(&mut self, selector: &str) -> FetchResult<Vec<ElementSnapshot>> {
        if self.closed {
            return Err(FetchError::SessionClosed);
        }
        let (_, html) = self.current.as_ref().ok_or(FetchError::NoPage)?;
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(html);
        Ok(document
            .select(&selector)
            .map(ElementSnapshot::from_element)
            .collect())
    }

    async fn close(&mut self) -> FetchResult<()> {
        self.closed = true;
        self.released.store(true, Ordering::SeqCst);
        self.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out_to_none() {
        let mut fetcher =
            MemoryFetcher::new().with_page("https://example.com/", "<html><body></body></html>");
        fetcher
            .goto(&Url::parse("https://example.com/").unwrap())
            .await
            .unwrap();

        let found = fetcher
            .wait_for("strong.price", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_wait_for_finds_present_element() {
        let mut fetcher = MemoryFetcher::new().with_page(
            "https://example.com/",
            "<html><body><strong class=\"price\">9 Kč</strong></body></html>",
        );
        fetcher
            .goto(&Url::parse("https://example.com/").unwrap())
            .await
            .unwrap();

        let found = fetcher
            .wait_for("strong.price", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(found.map(|el| el.text()), Some("9 Kč".to_string()));
    }
}
