//! Output module for crawl reporting
//!
//! This module handles:
//! - Recording per-run crawl statistics
//! - Printing run and store summaries for the command line

pub mod stats;

pub use stats::{
    load_store_summary, print_statistics, print_store_summary, CrawlStatistics, StoreSummary,
};
