//! Crawler coordinator - pagination control loop
//!
//! Drives listing pages 1, 2, 3, ... one at a time. Each page is handed to
//! the detail fan-out, and every product is persisted as soon as it arrives.
//! The next page is only requested after the current page's fan-out has
//! fully drained.
//!
//! A listing fetch that fails with one of the configured "past the last page"
//! statuses ends the crawl successfully. Any other listing failure, and any
//! persist failure, halts the crawl with the last completed page attached.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::extractor::RecordExtractor;
use crate::crawler::fanout::DetailFanout;
use crate::crawler::fetcher::{FetchError, PageClient};
use crate::model::Product;
use crate::output::CrawlStatistics;
use crate::state::{CrawlState, Termination};
use crate::storage::{IncrementalPersister, Persister};
use crate::HarvestError;
use futures::StreamExt;
use std::sync::Arc;
use url::Url;

/// Everything a coordinator needs besides its persister
struct Parts {
    start_url: Url,
    client: PageClient,
    fanout: DetailFanout,
}

impl Parts {
    fn build(config: &CrawlerConfig) -> Result<Self, HarvestError> {
        let start_url = Url::parse(&config.start_url)?;
        let client = PageClient::new(config)?;
        let fanout = DetailFanout::new(client.clone(), RecordExtractor::new()?)
            .with_item_selector(config.item_selector.clone());

        Ok(Self {
            start_url,
            client,
            fanout,
        })
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: CrawlerConfig,
    start_url: Url,
    client: PageClient,
    fanout: DetailFanout,
    persister: Arc<dyn Persister>,
    state: CrawlState,
    stats: CrawlStatistics,
}

impl Coordinator {
    /// Creates a coordinator that persists to the configured output stores
    ///
    /// The stores are opened last, so a configuration that fails to build a
    /// client or parse its URL leaves existing output untouched even with
    /// `fresh`.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Truncate both output stores before crawling
    pub fn new(config: Config, fresh: bool) -> Result<Self, HarvestError> {
        let parts = Parts::build(&config.crawler)?;
        let persister = IncrementalPersister::open(&config.output, fresh)?;
        Ok(Self::assemble(config.crawler, parts, Arc::new(persister)))
    }

    /// Creates a coordinator around an existing persister
    pub fn with_persister(
        config: CrawlerConfig,
        persister: Arc<dyn Persister>,
    ) -> Result<Self, HarvestError> {
        let parts = Parts::build(&config)?;
        Ok(Self::assemble(config, parts, persister))
    }

    fn assemble(config: CrawlerConfig, parts: Parts, persister: Arc<dyn Persister>) -> Self {
        Self {
            config,
            start_url: parts.start_url,
            client: parts.client,
            fanout: parts.fanout,
            persister,
            state: CrawlState::initial(),
            stats: CrawlStatistics::new(),
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.stats
    }

    /// Runs pagination until the crawl terminates
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlStatistics)` - The site ran out of pages or the page cap was hit
    /// * `Err(HarvestError::Halted)` - A fatal error stopped the crawl
    pub async fn run(&mut self) -> Result<CrawlStatistics, HarvestError> {
        tracing::info!("Starting crawl at {}", self.start_url);

        while !self.state.is_terminal() {
            self.step().await?;
        }

        self.stats.finish(self.state);
        tracing::info!(
            "Crawl completed ({}): {} products persisted from {} listing pages, {} items skipped",
            self.state,
            self.stats.products_persisted,
            self.stats.pages_completed,
            self.stats.total_item_failures()
        );

        Ok(self.stats.clone())
    }

    /// Processes one listing page and returns the resulting state
    ///
    /// Calling this on a terminated coordinator returns the terminal state
    /// again without issuing any request.
    pub async fn step(&mut self) -> Result<CrawlState, HarvestError> {
        let page = match self.state {
            CrawlState::Running { page } => page,
            CrawlState::Terminated(_) => return Ok(self.state),
        };

        let params = [(self.config.page_param.as_str(), page.to_string())];
        let listing_html = match self.client.fetch(self.start_url.as_str(), &params).await {
            Ok(html) => html,
            Err(FetchError::Status { status, .. })
                if self.config.end_of_pages_status.contains(&status) =>
            {
                tracing::info!("Listing page {} returned HTTP {}, no more pages", page, status);
                self.state = self
                    .state
                    .terminate(Termination::EndOfPages { page, status });
                return Ok(self.state);
            }
            Err(e) => return Err(self.halt(page, e.into())),
        };

        let mut stream = match self.fanout.run(&listing_html, &self.start_url, page) {
            Ok(stream) => stream,
            Err(e) => return Err(self.halt(page, e.into())),
        };
        let dispatched = stream.dispatched();
        if dispatched == 0 {
            tracing::warn!("Listing page {} has no item links", page);
        } else {
            tracing::info!("Listing page {}: {} items", page, dispatched);
        }
        self.stats.items_dispatched += dispatched as u64;

        while let Some(outcome) = stream.next().await {
            match outcome {
                Ok(product) => {
                    if let Err(e) = self.persist(product).await {
                        // Abort the rest of the page before reporting
                        drop(stream);
                        return Err(self.halt(page, e));
                    }
                    self.stats.products_persisted += 1;
                }
                Err(item_error) => {
                    tracing::warn!("Skipping item: {}", item_error);
                    self.stats.record_item_failure(item_error.kind.label());
                }
            }
        }

        self.stats.pages_completed += 1;
        self.state = match self.config.max_pages {
            Some(max) if page >= max => {
                tracing::info!("Reached page limit of {}", max);
                self.state
                    .terminate(Termination::PageLimit { last_page: page })
            }
            _ => self.state.advance(),
        };

        Ok(self.state)
    }

    /// Appends on the blocking pool so item tasks keep running meanwhile
    async fn persist(&self, product: Product) -> Result<(), HarvestError> {
        let persister = Arc::clone(&self.persister);
        tokio::task::spawn_blocking(move || persister.append(&product)).await??;
        Ok(())
    }

    /// Terminates as fatal and wraps the cause with the last completed page
    fn halt(&mut self, page: u32, source: HarvestError) -> HarvestError {
        self.state = self.state.terminate(Termination::Fatal { page });
        self.stats.finish(self.state);

        let last_completed_page = self.state.last_completed_page();
        tracing::error!(
            "Crawl halted on listing page {} (last completed page {}): {}",
            page,
            last_completed_page,
            source
        );

        HarvestError::Halted {
            last_completed_page,
            source: Box::new(source),
        }
    }
}

/// Runs a complete crawl
///
/// # Example
///
/// ```no_run
/// use catalog_harvester::config::Config;
/// use catalog_harvester::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stats = run_crawl(Config::default(), false).await?;
/// println!("{} products", stats.products_persisted);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, fresh: bool) -> Result<CrawlStatistics, HarvestError> {
    let mut coordinator = Coordinator::new(config, fresh)?;
    coordinator.run().await
}
