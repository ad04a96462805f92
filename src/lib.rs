//! Catalog-Harvester: a paginated catalog crawler
//!
//! This crate walks the listing pages of a product catalog, fans out to every
//! item's detail page concurrently, extracts a structured product record from
//! each, and appends the records to a JSON array store and a CSV store as they
//! arrive.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalog-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] crawler::ExtractionError),

    #[error("Listing error: {0}")]
    Listing(#[from] crawler::ListingError),

    #[error("Persist error: {0}")]
    Persist(#[from] storage::PersistError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    /// Fatal termination, carrying the last listing page that fully drained
    #[error("Crawl halted after page {last_completed_page}: {source}")]
    Halted {
        last_completed_page: u32,
        #[source]
        source: Box<HarvestError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns the last completed listing page if this is a fatal halt
    pub fn last_completed_page(&self) -> Option<u32> {
        match self {
            Self::Halted {
                last_completed_page,
                ..
            } => Some(*last_completed_page),
            _ => None,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Catalog-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{AdditionalInfo, Product};
pub use state::{CrawlState, Termination};
