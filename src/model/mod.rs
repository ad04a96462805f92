//! Record types produced by the crawl
//!
//! - `Product`: one catalog item, the unit of persistence
//! - `AdditionalInfo`: one configurable product dimension (size, color, ...)
//! - `ListingPage`: a listing page number and the item URLs found on it

mod product;

pub use product::{AdditionalInfo, ListingPage, Product};
