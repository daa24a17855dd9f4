//! Detail-page extraction
//!
//! One extraction visits a listing's detail page and collects whatever it can
//! into a `RawAttributeMap`:
//! 1. Field probes, each with a bounded presence wait
//! 2. Fee cards in the price box (rentals only)
//! 3. The parameter tables (label/value rows, or presence-only rows)
//! 4. Point-of-interest distance cards
//!
//! A field that is not found is a miss for that field only. Only a failure to
//! load the page, or a session failure, fails the whole listing.

use crate::config::{FieldProbe, SelectorConfig};
use crate::crawler::parser::normalize_nbsp;
use crate::fetch::{ElementSnapshot, FetchError, PageFetcher};
use crate::schema::RawAttributeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Label the listing URL is stored under
pub const URL_FIELD: &str = "URL";

/// Listing-level extraction failure
#[derive(Debug, Error)]
#[error("Failed to extract listing {url}: {source}")]
pub struct ExtractError {
    pub url: String,
    #[source]
    pub source: FetchError,
}

impl ExtractError {
    /// Returns true if the failure took the fetch session down
    pub fn is_fatal(&self) -> bool {
        self.source.is_fatal()
    }
}

/// Outcome of a single field probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Found(String),
    Missed,
}

/// Attributes collected from one detail page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub attributes: RawAttributeMap,

    /// Probes and scans that found nothing
    pub misses: Vec<String>,
}

/// Extracts raw attributes from listing detail pages
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    selectors: SelectorConfig,
    wait_timeout: Duration,
}

impl ListingExtractor {
    pub fn new(selectors: SelectorConfig, wait_timeout: Duration) -> Self {
        Self {
            selectors,
            wait_timeout,
        }
    }

    /// Visits `url` and extracts its attributes
    ///
    /// # Returns
    ///
    /// * `Ok(Extraction)` - Attributes found, possibly with misses
    /// * `Err(ExtractError)` - The page could not be loaded or the session failed
    pub async fn extract<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        url: &Url,
    ) -> Result<Extraction, ExtractError> {
        self.extract_page(fetcher, url)
            .await
            .map_err(|source| ExtractError {
                url: url.to_string(),
                source,
            })
    }

    async fn extract_page<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        url: &Url,
    ) -> Result<Extraction, FetchError> {
        fetcher.goto(url).await?;
        tracing::info!("Visiting listing {}", url);

        let mut extraction = Extraction::default();
        extraction.attributes.insert_text(URL_FIELD, url.as_str());

        let mut offer_type = None;
        for probe in &self.selectors.probes {
            match self.probe(fetcher, probe, url).await? {
                Probe::Found(value) => {
                    if probe.field == self.selectors.offer_type_field {
                        offer_type = Some(value.clone());
                    }
                    extraction.attributes.insert_text(&probe.field, value);
                }
                Probe::Missed => extraction.misses.push(probe.field.clone()),
            }
        }

        if offer_type.as_deref() != Some(self.selectors.sale_offer_type.as_str()) {
            self.scan_fee_cards(fetcher, &mut extraction).await?;
        }
        self.scan_parameter_tables(fetcher, url, &mut extraction).await?;
        self.scan_poi_cards(fetcher, url, &mut extraction).await?;

        tracing::debug!(
            "Extracted {} attributes from {} ({} misses)",
            extraction.attributes.len(),
            url,
            extraction.misses.len()
        );
        Ok(extraction)
    }

    /// Reads one field, waiting at most the configured timeout
    ///
    /// An element with no text counts as a miss.
    pub async fn probe<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        probe: &FieldProbe,
        url: &Url,
    ) -> Result<Probe, FetchError> {
        let text = fetcher
            .wait_for(&probe.selector, self.wait_timeout)
            .await?
            .map(|element| element.text())
            .filter(|text| !text.is_empty());

        match text {
            Some(text) => Ok(Probe::Found(text)),
            None => {
                tracing::warn!(
                    "Unable to find '{}' at '{}' on {}",
                    probe.field,
                    probe.selector,
                    url
                );
                Ok(Probe::Missed)
            }
        }
    }

    /// Fee and deposit cards of the price box; `+` prefixes are dropped
    async fn scan_fee_cards<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        extraction: &mut Extraction,
    ) -> Result<(), FetchError> {
        for card in fetcher.find_all(&self.selectors.fee_cards).await? {
            let label = card.find_text(&self.selectors.fee_card_label)?;
            let value = card.find_text(&self.selectors.fee_card_value)?;

            let (Some(label), Some(value)) = (label, value) else {
                continue;
            };
            let label = label.replace('+', "");
            let label = label.trim();
            if label.is_empty() {
                continue;
            }

            extraction.attributes.insert_text(label, value);
        }
        Ok(())
    }

    /// Parameter table rows
    ///
    /// A row with a label becomes label → value. A row with an empty or
    /// missing label lists an amenity: its value becomes the label, marked
    /// present.
    async fn scan_parameter_tables<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        url: &Url,
        extraction: &mut Extraction,
    ) -> Result<(), FetchError> {
        let Some(tables) = self
            .wait_for_all(fetcher, &self.selectors.parameter_tables, "parameters", url)
            .await?
        else {
            extraction.misses.push("parameters".to_string());
            return Ok(());
        };

        for table in tables {
            for row in table.find_all("tr")? {
                scan_parameter_row(&row, &self.selectors, &mut extraction.attributes)?;
            }
        }
        Ok(())
    }

    /// Distance-to-point-of-interest cards
    async fn scan_poi_cards<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        url: &Url,
        extraction: &mut Extraction,
    ) -> Result<(), FetchError> {
        let Some(cards) = self
            .wait_for_all(fetcher, &self.selectors.poi_cards, "points of interest", url)
            .await?
        else {
            extraction.misses.push("points of interest".to_string());
            return Ok(());
        };

        for card in cards {
            let label = card.find_text(&self.selectors.poi_label)?;
            let value = card.find_text(&self.selectors.poi_value)?;

            match (label, value) {
                (Some(label), Some(value)) if !label.is_empty() => {
                    extraction
                        .attributes
                        .insert_text(&label, normalize_nbsp(&value).trim());
                }
                _ => tracing::debug!("Skipping incomplete point-of-interest card on {}", url),
            }
        }
        Ok(())
    }

    /// Waits for a section to appear, then returns every match
    async fn wait_for_all<F: PageFetcher>(
        &self,
        fetcher: &mut F,
        selector: &str,
        section: &str,
        url: &Url,
    ) -> Result<Option<Vec<ElementSnapshot>>, FetchError> {
        if fetcher.wait_for(selector, self.wait_timeout).await?.is_none() {
            tracing::warn!("Unable to find {} at '{}' on {}", section, selector, url);
            return Ok(None);
        }
        Ok(Some(fetcher.find_all(selector).await?))
    }
}

fn scan_parameter_row(
    row: &ElementSnapshot,
    selectors: &SelectorConfig,
    attributes: &mut RawAttributeMap,
) -> Result<(), FetchError> {
    let Some(value) = row.find_text(&selectors.parameter_value)? else {
        tracing::debug!("Skipping parameter row without a value cell");
        return Ok(());
    };
    let label = row.find_text(&selectors.parameter_label)?.unwrap_or_default();

    if !label.is_empty() {
        attributes.insert_text(&label, value);
    } else if !value.is_empty() {
        attributes.insert_present(&value);
    }
    Ok(())
}
