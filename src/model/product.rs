use serde::{Deserialize, Serialize};
use url::Url;

/// One configurable product dimension and its selectable options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalInfo {
    /// Dimension name (e.g. "Size")
    pub label: String,

    /// Selectable options, placeholder entries already removed
    pub values: Vec<String>,
}

impl AdditionalInfo {
    /// Builds an entry, returning None when no real option remains
    pub fn new(label: impl Into<String>, values: Vec<String>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            label: label.into(),
            values,
        })
    }
}

/// One catalog item
///
/// Built once per detail page with its variant list already complete,
/// then handed to the persister and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,

    #[serde(rename = "image")]
    pub image_url: String,

    pub price: String,
    pub sku: String,
    pub short_description: String,
    pub description: String,
    pub category: String,

    #[serde(default)]
    pub additional: Vec<AdditionalInfo>,
}

impl Product {
    /// Returns true if the product has no configurable dimensions
    pub fn is_simple(&self) -> bool {
        self.additional.is_empty()
    }
}

/// A listing page and the detail URLs discovered on it
///
/// Lives for one pagination step only.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub number: u32,
    pub item_urls: Vec<Url>,
}
