use crate::config::types::{Config, CrawlConfig, FetcherConfig, OutputConfig, SelectorConfig};
use crate::schema::PRESENCE_SENTINEL;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_output_config(&config.output)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates crawl traversal configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.entry_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid entry-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "entry-url '{}' must use the http or https scheme",
            config.entry_url
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.wait_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "wait_timeout_ms must be >= 1ms".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.store_path.is_empty() {
        return Err(ConfigError::Validation(
            "store_path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.alias_path, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "alias_path cannot be empty when set".to_string(),
        ));
    }

    if config.null_marker.is_empty() {
        return Err(ConfigError::Validation(
            "null_marker cannot be empty".to_string(),
        ));
    }

    // A null marker equal to the presence sentinel would make absent and
    // present amenities indistinguishable in the store
    if config.null_marker == PRESENCE_SENTINEL {
        return Err(ConfigError::Validation(format!(
            "null_marker cannot be the presence sentinel '{}'",
            PRESENCE_SENTINEL
        )));
    }

    Ok(())
}

/// Validates that every configured selector parses
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (name, selector) in config.all() {
        validate_selector(&name, selector)?;
    }

    for probe in &config.probes {
        if probe.field.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "probe with selector '{}' has an empty field name",
                probe.selector
            )));
        }
    }

    Ok(())
}

fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(format!(
            "{} cannot be empty",
            name
        )));
    }

    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, selector, e)))
}
