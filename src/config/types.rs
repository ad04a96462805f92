use crate::crawler::ITEM_LINK_SELECTOR;
use serde::{Deserialize, Serialize};

/// Catalog root crawled when no start URL is configured
pub const DEFAULT_START_URL: &str = "https://gopher1.extrkt.com/";

/// Browser-like identification sent with every request
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0";

/// Main configuration structure for Catalog-Harvester
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    /// Listing URL that pagination starts from
    #[serde(rename = "start-url", default = "default_start_url")]
    pub start_url: String,

    /// Query parameter that selects the listing page number
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// User agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Listing-page statuses that mean "past the last page"
    #[serde(rename = "end-of-pages-status", default = "default_end_of_pages_status")]
    pub end_of_pages_status: Vec<u16>,

    /// Optional cap on the number of listing pages to crawl
    #[serde(rename = "max-pages", default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,

    /// CSS selector for item links on a listing page
    #[serde(rename = "item-selector", default = "default_item_selector")]
    pub item_selector: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
            page_param: default_page_param(),
            user_agent: default_user_agent(),
            request_timeout_ms: default_request_timeout_ms(),
            end_of_pages_status: default_end_of_pages_status(),
            max_pages: None,
            item_selector: default_item_selector(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Path to the structured-array (JSON) store
    #[serde(rename = "json-path", default = "default_json_path")]
    pub json_path: String,

    /// Path to the tabular (CSV) store
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: default_json_path(),
            csv_path: default_csv_path(),
        }
    }
}

fn default_start_url() -> String {
    DEFAULT_START_URL.to_string()
}

fn default_page_param() -> String {
    "paged".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_end_of_pages_status() -> Vec<u16> {
    vec![404]
}

fn default_item_selector() -> String {
    ITEM_LINK_SELECTOR.to_string()
}

fn default_json_path() -> String {
    "products.json".to_string()
}

fn default_csv_path() -> String {
    "products.csv".to_string()
}
