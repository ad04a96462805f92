//! Crawler module for listing pagination and detail extraction
//!
//! This module contains the core crawl pipeline:
//! - `PageClient`: one HTTP GET per call, typed failures
//! - `RecordExtractor`: detail page markup to `Product`
//! - `DetailFanout`: concurrent fetch+extract for every item on a listing page
//! - `Coordinator`: the pagination control loop feeding the persister

mod coordinator;
mod extractor;
mod fanout;
mod fetcher;
mod parser;

pub use coordinator::{run_crawl, Coordinator};
pub use extractor::{ExtractionError, RecordExtractor, PLACEHOLDER_OPTION};
pub use fanout::{DetailFanout, DetailStream, ItemError, ItemErrorKind, ItemOutcome};
pub use fetcher::{build_http_client, FetchError, PageClient};
pub use parser::{parse_listing, ListingError, ITEM_LINK_SELECTOR};
