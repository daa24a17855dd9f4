//! Text and link helpers for scraped markup
//!
//! This module handles the small normalizations every extracted string goes
//! through:
//! - Whitespace cleanup (newlines stripped, runs collapsed, trimmed)
//! - Non-breaking space normalization for distance values
//! - Resolving listing and pagination hrefs to absolute URLs

use url::Url;

/// Cleans element text for storage
///
/// Newlines and runs of ASCII whitespace collapse to one space and the result
/// is trimmed, the way a browser renders source whitespace. A `<br>` adds no
/// text node, so text split by one joins without a space. Non-breaking spaces
/// are kept; see `normalize_nbsp`.
///
/// # Example
///
/// ```
/// use listing_crawler::crawler::clean_text;
///
/// assert_eq!(clean_text("\n  2+kk \n  Praha\n"), "2+kk Praha");
/// ```
pub fn clean_text(raw: &str) -> String {
    raw.split(|c: char| c.is_ascii_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replaces non-breaking spaces with ordinary spaces
pub fn normalize_nbsp(text: &str) -> String {
    text.replace('\u{a0}', " ")
}

/// Resolves an href to an absolute HTTP(S) URL
///
/// Returns None if the link cannot point at a listing or index page:
/// - javascript:, mailto:, tel: and data: schemes
/// - Empty and fragment-only hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    absolute_url.set_fragment(None);
    Some(absolute_url)
}
