//! Per-page detail fan-out
//!
//! For one listing page, every item link gets its own fetch+extract task.
//! The tasks run on the runtime independently of the consumer, share one
//! connection pool, and their outcomes come back in completion order, not
//! listing order. Fan-out width is the page's item count; pages are never
//! overlapped.
//!
//! Dropping a `DetailStream` before it is exhausted aborts every item still
//! in flight.

use crate::crawler::extractor::{ExtractionError, RecordExtractor};
use crate::crawler::fetcher::{FetchError, PageClient};
use crate::crawler::parser::{parse_listing, ListingError, ITEM_LINK_SELECTOR};
use crate::model::Product;
use futures::stream::Stream;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::task::JoinSet;
use url::Url;

/// What went wrong with a single item
#[derive(Debug, Error)]
pub enum ItemErrorKind {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("item task panicked")]
    Panicked,
}

impl ItemErrorKind {
    /// Short label used for failure counters
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::Transport { .. }) => "transport",
            Self::Fetch(FetchError::Status { .. }) => "status",
            Self::Extraction(_) => "extraction",
            Self::Panicked => "panic",
        }
    }
}

/// A detail page that produced no product; reported and skipped
#[derive(Debug, Error)]
#[error("Item {url} failed: {kind}")]
pub struct ItemError {
    pub url: String,
    pub kind: ItemErrorKind,
}

/// Result of one item's fetch+extract unit
pub type ItemOutcome = Result<Product, ItemError>;

/// Dispatches detail fetches for listing pages
#[derive(Debug)]
pub struct DetailFanout {
    client: PageClient,
    extractor: Arc<RecordExtractor>,
    item_selector: String,
}

impl DetailFanout {
    pub fn new(client: PageClient, extractor: RecordExtractor) -> Self {
        Self {
            client,
            extractor: Arc::new(extractor),
            item_selector: ITEM_LINK_SELECTOR.to_string(),
        }
    }

    /// Overrides the selector used to find item links on listing pages
    pub fn with_item_selector(mut self, selector: impl Into<String>) -> Self {
        self.item_selector = selector.into();
        self
    }

    /// Reads the item links from `listing_html` and starts one task per item
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `listing_html` - Markup of the listing page
    /// * `listing_url` - URL the listing was fetched from, for resolving links
    /// * `page` - Listing page number, carried for reporting
    ///
    /// # Returns
    ///
    /// * `Ok(DetailStream)` - Stream of item outcomes in completion order
    /// * `Err(ListingError)` - The listing could not be read for item links
    pub fn run(
        &self,
        listing_html: &str,
        listing_url: &Url,
        page: u32,
    ) -> Result<DetailStream, ListingError> {
        let listing = parse_listing(listing_html, listing_url, page, &self.item_selector)?;
        Ok(self.dispatch(page, listing.item_urls))
    }

    /// Spawns one fetch+extract task per URL
    pub fn dispatch(&self, page: u32, item_urls: Vec<Url>) -> DetailStream {
        let mut in_flight = JoinSet::new();
        for url in item_urls {
            in_flight.spawn(fetch_item(
                self.client.clone(),
                Arc::clone(&self.extractor),
                url,
            ));
        }
        let dispatched = in_flight.len();

        tracing::debug!("Dispatched {} item fetches for page {}", dispatched, page);

        DetailStream {
            page,
            dispatched,
            in_flight,
        }
    }
}

async fn fetch_item(
    client: PageClient,
    extractor: Arc<RecordExtractor>,
    url: Url,
) -> ItemOutcome {
    let url = url.to_string();
    tracing::debug!("Fetching item {}", url);

    let unit = async {
        let html = client.fetch(&url, &[]).await?;
        Ok::<_, ItemErrorKind>(extractor.extract(&html)?)
    };
    let result = AssertUnwindSafe(unit).catch_unwind().await;

    match result {
        Ok(Ok(product)) => Ok(product),
        Ok(Err(kind)) => Err(ItemError { url, kind }),
        Err(_) => Err(ItemError {
            url,
            kind: ItemErrorKind::Panicked,
        }),
    }
}

/// Item outcomes for one listing page, yielded as they complete
pub struct DetailStream {
    page: u32,
    dispatched: usize,
    in_flight: JoinSet<ItemOutcome>,
}

impl DetailStream {
    /// The listing page these items came from
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Number of item tasks started for this page
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Number of tasks whose outcome has not been yielded yet
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }
}

impl Stream for DetailStream {
    type Item = ItemOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(self.in_flight.poll_join_next(cx)) {
                Some(Ok(outcome)) => return Poll::Ready(Some(outcome)),
                // Only reachable through abort; panics are caught inside the task
                Some(Err(e)) => tracing::error!("Item task on page {} ended: {}", self.page, e),
                None => return Poll::Ready(None),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = self.in_flight.len();
        (pending, Some(pending))
    }
}
