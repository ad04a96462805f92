//! Listing page parser
//!
//! Pulls the item detail links out of a listing page's product grid and
//! resolves them to absolute URLs.

use crate::model::ListingPage;
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// Item links within the product grid
pub const ITEM_LINK_SELECTOR: &str = "a.woocommerce-loop-product__link";

/// Errors that prevent reading item links from a listing page
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Invalid item link selector '{0}'")]
    InvalidSelector(String),
}

/// Parses a listing page and collects its item links
///
/// Links are resolved against `base_url`. Non-HTTP(S) and fragment-only
/// links are skipped, and repeated links are kept only at their first
/// position.
///
/// # Example
///
/// ```no_run
/// use catalog_harvester::crawler::{parse_listing, ITEM_LINK_SELECTOR};
/// use url::Url;
///
/// let html = r#"<ul class="products"><li><a class="woocommerce-loop-product__link" href="/product/cap/">Cap</a></li></ul>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let listing = parse_listing(html, &base_url, 1, ITEM_LINK_SELECTOR).unwrap();
/// assert_eq!(listing.item_urls[0].as_str(), "https://example.com/product/cap/");
/// ```
pub fn parse_listing(
    html: &str,
    base_url: &Url,
    number: u32,
    item_selector: &str,
) -> Result<ListingPage, ListingError> {
    let selector = Selector::parse(item_selector)
        .map_err(|_| ListingError::InvalidSelector(item_selector.to_string()))?;
    let document = Html::parse_document(html);

    let mut item_urls: Vec<Url> = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(url) = resolve_link(href, base_url) {
            if !item_urls.contains(&url) {
                item_urls.push(url);
            }
        }
    }

    Ok(ListingPage { number, item_urls })
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
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

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}
