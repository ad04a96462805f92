//! Persister trait and error types
//!
//! This module defines the trait interface for record sinks and the errors
//! they report. Every persist error is fatal to the crawl.

use crate::model::Product;
use thiserror::Error;

/// Errors that can occur while persisting a record
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Persister lock poisoned")]
    Poisoned,
}

/// Result type for persist operations
pub type PersistResult<T> = Result<T, PersistError>;

/// Trait for sinks that durably record products as they arrive
///
/// Implementations must be safe to call from concurrent item completions;
/// each `append` is one critical section.
pub trait Persister: Send + Sync {
    /// Records one product; returns only after the write is durable
    fn append(&self, product: &Product) -> PersistResult<()>;

    /// Number of products appended through this persister
    fn appended(&self) -> u64;
}
