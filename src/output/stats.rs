//! Crawl statistics
//!
//! Counters kept by the pagination controller during a run, plus a summary
//! read back from the structured-array store for `--stats`.

use crate::state::{CrawlState, Termination};
use crate::storage::{JsonArrayStore, PersistResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;

/// Counters for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Listing pages whose fan-out fully drained
    pub pages_completed: u32,

    /// Detail fetches started across all pages
    pub items_dispatched: u64,

    pub products_persisted: u64,

    /// Item failures keyed by kind (transport, status, extraction)
    pub item_failures: BTreeMap<&'static str, u64>,

    pub termination: Option<Termination>,
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_completed: 0,
            items_dispatched: 0,
            products_persisted: 0,
            item_failures: BTreeMap::new(),
            termination: None,
        }
    }

    pub fn record_item_failure(&mut self, kind: &'static str) {
        *self.item_failures.entry(kind).or_insert(0) += 1;
    }

    pub fn total_item_failures(&self) -> u64 {
        self.item_failures.values().sum()
    }

    /// Stamps the finish time and termination reason once
    pub fn finish(&mut self, state: CrawlState) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
        self.termination = state.termination();
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Share of dispatched items that were persisted, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.items_dispatched == 0 {
            return 0.0;
        }
        (self.products_persisted as f64 / self.items_dispatched as f64) * 100.0
    }
}

/// Prints run statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Started: {}", stats.started_at.to_rfc3339());
    if let Some(seconds) = stats.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    if let Some(reason) = stats.termination {
        println!("  Termination: {}", reason.as_str());
    }
    println!("  Listing pages completed: {}", stats.pages_completed);
    println!("  Items dispatched: {}", stats.items_dispatched);
    println!("  Products persisted: {}", stats.products_persisted);
    println!();

    if !stats.item_failures.is_empty() {
        println!("Item Failures:");
        for (kind, count) in &stats.item_failures {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} items persisted)",
        stats.success_rate(),
        stats.products_persisted,
        stats.items_dispatched
    );
}

/// Summary of what the structured-array store currently holds
#[derive(Debug, Clone, Default)]
pub struct StoreSummary {
    pub total_products: u64,

    /// Products with at least one configurable dimension
    pub variable_products: u64,

    pub by_category: BTreeMap<String, u64>,
}

/// Reads the structured-array store and tallies its products
pub fn load_store_summary(json_path: &Path) -> PersistResult<StoreSummary> {
    let products = JsonArrayStore::new(json_path).load()?;

    let mut summary = StoreSummary {
        total_products: products.len() as u64,
        ..StoreSummary::default()
    };

    for product in &products {
        if !product.is_simple() {
            summary.variable_products += 1;
        }
        let category = if product.category.is_empty() {
            "(uncategorized)".to_string()
        } else {
            product.category.clone()
        };
        *summary.by_category.entry(category).or_insert(0) += 1;
    }

    Ok(summary)
}

/// Prints a store summary to stdout
pub fn print_store_summary(summary: &StoreSummary) {
    println!("=== Stored Products ===\n");
    println!("  Total products: {}", summary.total_products);
    println!("  With variants: {}", summary.variable_products);
    println!();

    if !summary.by_category.is_empty() {
        println!("Products by Category:");
        let mut counts: Vec<_> = summary.by_category.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (category, count) in counts {
            println!("  {}: {}", category, count);
        }
    }
}
