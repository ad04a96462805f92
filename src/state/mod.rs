//! State module for tracking crawl progress
//!
//! `CrawlState` is the pagination controller's state machine: it starts at
//! `Running { page: 1 }`, advances one listing page at a time, and ends in a
//! `Terminated` state that never changes again.

mod crawl_state;

pub use crawl_state::{CrawlState, Termination};
