use serde::Deserialize;

/// Main configuration structure for a crawl run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Crawl traversal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// First index page of the listing search
    #[serde(rename = "entry-url")]
    pub entry_url: String,

    /// Maximum number of index pages visited per run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Fixed delay before each index page visit (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Upper bound for each element presence wait (milliseconds)
    #[serde(rename = "wait-timeout-ms", default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

/// HTTP page fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the CSV store
    #[serde(rename = "store-path")]
    pub store_path: String,

    /// Path to the versioned alias table (TOML)
    #[serde(rename = "alias-path", default)]
    pub alias_path: Option<String>,

    /// Literal written for columns without a value
    #[serde(rename = "null-marker", default = "default_null_marker")]
    pub null_marker: String,
}

/// CSS selectors locating listing data on index and detail pages
///
/// The defaults mirror the page layout of the listing site the crawler was
/// written against; every selector can be overridden from the `[selectors]`
/// table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Anchors linking an index page to its detail pages
    #[serde(rename = "listing-links")]
    pub listing_links: String,

    /// Candidate "next page" anchors
    #[serde(rename = "next-page")]
    pub next_page: String,

    /// Text the next-page anchor must contain, if set
    #[serde(rename = "next-page-text")]
    pub next_page_text: Option<String>,

    /// Single-value field probes
    #[serde(rename = "probe")]
    pub probes: Vec<FieldProbe>,

    /// Probe field holding the offer type
    #[serde(rename = "offer-type-field")]
    pub offer_type_field: String,

    /// Offer type for which the fee cards are not scanned
    #[serde(rename = "sale-offer-type")]
    pub sale_offer_type: String,

    /// Price box cards carrying fees and deposits
    #[serde(rename = "fee-cards")]
    pub fee_cards: String,

    #[serde(rename = "fee-card-label")]
    pub fee_card_label: String,

    #[serde(rename = "fee-card-value")]
    pub fee_card_value: String,

    /// Parameter tables (one per section)
    #[serde(rename = "parameter-tables")]
    pub parameter_tables: String,

    #[serde(rename = "parameter-label")]
    pub parameter_label: String,

    #[serde(rename = "parameter-value")]
    pub parameter_value: String,

    /// Point-of-interest cards
    #[serde(rename = "poi-cards")]
    pub poi_cards: String,

    #[serde(rename = "poi-label")]
    pub poi_label: String,

    #[serde(rename = "poi-value")]
    pub poi_value: String,
}

/// A semantic field read from one element of the detail page
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FieldProbe {
    /// Attribute label the probed text is stored under
    pub field: String,

    /// CSS selector of the element holding the value
    pub selector: String,
}

impl FieldProbe {
    pub fn new(field: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            selector: selector.into(),
        }
    }
}

const DETAIL_MAIN: &str = "body > div:nth-of-type(1) > main > div:nth-of-type(2) > section > div";

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_links: "#__next > main > section > div > div:nth-of-type(2) > div > \
                div:nth-of-type(5) > section > article div:nth-of-type(2) > h2 a"
                .to_string(),
            next_page: "li.page-item > a.page-link".to_string(),
            next_page_text: Some("Další".to_string()),
            probes: vec![
                FieldProbe::new(
                    "LOKACE",
                    format!(
                        "{DETAIL_MAIN} > div:nth-of-type(1) > span > span:nth-of-type(1) > \
                         span:nth-of-type(2) > a"
                    ),
                ),
                FieldProbe::new(
                    "TYP NABÍDKY",
                    "#__next > main > div:nth-of-type(1) > div > div:nth-of-type(1) > nav > ol > \
                     li:nth-of-type(3) > a",
                ),
                FieldProbe::new(
                    "CENA",
                    format!(
                        "{DETAIL_MAIN} > div:nth-of-type(2) > div > div > div:nth-of-type(1) > \
                         div > div:nth-of-type(1) > span:nth-of-type(2) > strong"
                    ),
                ),
            ],
            offer_type_field: "TYP NABÍDKY".to_string(),
            sale_offer_type: "PRODEJ".to_string(),
            fee_cards: format!(
                "{DETAIL_MAIN} > div:nth-of-type(2) > div > div > div:nth-of-type(1) > div > div"
            ),
            fee_card_label: "span:nth-of-type(1) > span".to_string(),
            fee_card_value: "span:nth-of-type(2) > strong".to_string(),
            parameter_tables: format!(
                "{DETAIL_MAIN} > div:nth-of-type(1) > div:nth-of-type(4) > div > section"
            ),
            parameter_label: "th".to_string(),
            parameter_value: "td".to_string(),
            poi_cards: format!(
                "{DETAIL_MAIN} > div:nth-of-type(1) > section:nth-of-type(1) > div > \
                 div:nth-of-type(2) > div:nth-of-type(1) div.poiItem"
            ),
            poi_label: "span.poiItemContentType".to_string(),
            poi_value: "div.poiItemTimes > strong".to_string(),
        }
    }
}

impl SelectorConfig {
    /// Every selector paired with the key it is configured under
    pub fn all(&self) -> Vec<(String, &str)> {
        let mut selectors = vec![
            ("listing-links".to_string(), self.listing_links.as_str()),
            ("next-page".to_string(), self.next_page.as_str()),
            ("fee-cards".to_string(), self.fee_cards.as_str()),
            ("fee-card-label".to_string(), self.fee_card_label.as_str()),
            ("fee-card-value".to_string(), self.fee_card_value.as_str()),
            ("parameter-tables".to_string(), self.parameter_tables.as_str()),
            ("parameter-label".to_string(), self.parameter_label.as_str()),
            ("parameter-value".to_string(), self.parameter_value.as_str()),
            ("poi-cards".to_string(), self.poi_cards.as_str()),
            ("poi-label".to_string(), self.poi_label.as_str()),
            ("poi-value".to_string(), self.poi_value.as_str()),
        ];
        for probe in &self.probes {
            selectors.push((format!("probe '{}'", probe.field), probe.selector.as_str()));
        }
        selectors
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_delay_ms() -> u64 {
    5000
}

fn default_wait_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/74.0.3729.169 Safari/537.36"
        .to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_null_marker() -> String {
    crate::schema::DEFAULT_NULL_MARKER.to_string()
}
