//! Storage module for persisting crawl records
//!
//! This module handles the two output stores:
//! - a JSON array of every product (read-modify-write per append)
//! - a CSV table with one row group per product (true append)
//!
//! `IncrementalPersister` writes each completed product to both before the
//! crawl moves on.

mod csv_store;
mod json_store;
mod persister;
mod traits;

pub use csv_store::{product_rows, CsvStore, CSV_HEADERS, VALUES_SEPARATOR};
pub use json_store::JsonArrayStore;
pub use persister::IncrementalPersister;
pub use traits::{PersistError, PersistResult, Persister};
