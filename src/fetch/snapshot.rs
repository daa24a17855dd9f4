use crate::crawler::clean_text;
use crate::fetch::{FetchError, FetchResult};
use scraper::{ElementRef, Html, Selector};

/// Owned copy of one element's outer HTML
///
/// Snapshots outlive the page they were taken from, so nested lookups (a cell
/// inside a row, a label inside a card) never touch the page context again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    tag: String,
    html: String,
}

impl ElementSnapshot {
    pub fn from_element(element: ElementRef<'_>) -> Self {
        Self {
            tag: element.value().name().to_string(),
            html: element.html(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Cleaned text content of the element
    pub fn text(&self) -> String {
        self.with_root(|root| clean_text(&root.text().collect::<String>()))
            .unwrap_or_default()
    }

    /// Attribute value on the element itself
    pub fn attr(&self, name: &str) -> Option<String> {
        self.with_root(|root| root.value().attr(name).map(str::to_string))
            .flatten()
    }

    /// Cleaned text of the first descendant matching `selector`
    pub fn find_text(&self, selector: &str) -> FetchResult<Option<String>> {
        let selector = parse_selector(selector)?;
        Ok(self
            .with_root(|root| {
                root.select(&selector)
                    .next()
                    .map(|el| clean_text(&el.text().collect::<String>()))
            })
            .flatten())
    }

    /// Descendants matching `selector`, in document order
    pub fn find_all(&self, selector: &str) -> FetchResult<Vec<ElementSnapshot>> {
        let selector = parse_selector(selector)?;
        Ok(self
            .with_root(|root| root.select(&selector).map(Self::from_element).collect())
            .unwrap_or_default())
    }

    /// Re-parses the markup and hands the element back as a tree root
    fn with_root<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> Option<T> {
        let fragment = Html::parse_fragment(&wrap_for_parsing(&self.tag, &self.html));
        let root_selector = Selector::parse(&self.tag).ok()?;
        let root = fragment.select(&root_selector).next()?;
        Some(f(root))
    }
}

/// Table parts are dropped when parsed outside a table, so they get their
/// parent elements back before parsing
fn wrap_for_parsing(tag: &str, html: &str) -> String {
    match tag {
        "tr" => format!("<table><tbody>{}</tbody></table>", html),
        "td" | "th" => format!("<table><tbody><tr>{}</tr></tbody></table>", html),
        "thead" | "tbody" | "tfoot" | "caption" => format!("<table>{}</table>", html),
        _ => html.to_string(),
    }
}

pub(crate) fn parse_selector(selector: &str) -> FetchResult<Selector> {
    Selector::parse(selector).map_err(|_| FetchError::InvalidSelector(selector.to_string()))
}
