//! Detail page extraction
//!
//! Maps a product detail page to a `Product`. Each scalar field is an
//! independent lookup; the variant table is read last so the record is built
//! in one go with its `additional` list complete.

use crate::model::{AdditionalInfo, Product};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Option text the variant dropdowns use as their "nothing selected" entry
pub const PLACEHOLDER_OPTION: &str = "Choose an option";

const TITLE_SELECTOR: &str = "h1.product_title";
const IMAGE_SELECTOR: &str = "div.woocommerce-product-gallery__image > a";
const PRICE_SELECTOR: &str = "span.amount > bdi";
const SHORT_DESCRIPTION_SELECTOR: &str = "div.woocommerce-product-details__short-description > p";
const DESCRIPTION_SELECTOR: &str = "div#tab-description > p";
const SKU_SELECTOR: &str = "span.sku";
const CATEGORY_SELECTOR: &str = "span.posted_in > a";
const VARIANT_ROW_SELECTOR: &str = "table.variations > tbody > tr";
const VARIANT_LABEL_SELECTOR: &str = "th > label";
const VARIANT_OPTION_SELECTOR: &str = "td > select > option";

/// Errors from extracting a product out of a detail page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Required field '{field}' not found")]
    MissingField { field: &'static str },

    #[error("Invalid selector for field '{field}'")]
    InvalidSelector { field: &'static str },
}

/// Pre-parsed selectors for the detail page layout
#[derive(Debug)]
pub struct RecordExtractor {
    title: Selector,
    image: Selector,
    price: Selector,
    short_description: Selector,
    description: Selector,
    sku: Selector,
    category: Selector,
    variant_row: Selector,
    variant_label: Selector,
    variant_option: Selector,
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|_| ExtractionError::InvalidSelector { field })
}

/// Concatenated, trimmed text of an element
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

impl RecordExtractor {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            title: compile("title", TITLE_SELECTOR)?,
            image: compile("image", IMAGE_SELECTOR)?,
            price: compile("price", PRICE_SELECTOR)?,
            short_description: compile("short_description", SHORT_DESCRIPTION_SELECTOR)?,
            description: compile("description", DESCRIPTION_SELECTOR)?,
            sku: compile("sku", SKU_SELECTOR)?,
            category: compile("category", CATEGORY_SELECTOR)?,
            variant_row: compile("additional", VARIANT_ROW_SELECTOR)?,
            variant_label: compile("additional.label", VARIANT_LABEL_SELECTOR)?,
            variant_option: compile("additional.values", VARIANT_OPTION_SELECTOR)?,
        })
    }

    /// Extracts a product from detail page markup
    ///
    /// `title` is required; the other scalar fields become empty strings when
    /// their element is absent.
    ///
    /// # Returns
    ///
    /// * `Ok(Product)` - The extracted record
    /// * `Err(ExtractionError::MissingField)` - The title element is missing or empty
    pub fn extract(&self, html: &str) -> Result<Product, ExtractionError> {
        let document = Html::parse_document(html);

        let title = self
            .first_text(&document, &self.title)
            .filter(|t| !t.is_empty())
            .ok_or(ExtractionError::MissingField { field: "title" })?;

        let image_url = document
            .select(&self.image)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .unwrap_or_default();

        let price = self.first_text(&document, &self.price).unwrap_or_default();
        let sku = self.first_text(&document, &self.sku).unwrap_or_default();
        let short_description = self.joined_text(&document, &self.short_description, "\n");
        let description = self.joined_text(&document, &self.description, "\n");
        let category = self.joined_text(&document, &self.category, ", ");
        let additional = self.variants(&document);

        Ok(Product {
            title,
            image_url,
            price,
            sku,
            short_description,
            description,
            category,
            additional,
        })
    }

    fn first_text(&self, document: &Html, selector: &Selector) -> Option<String> {
        document.select(selector).next().map(element_text)
    }

    fn joined_text(&self, document: &Html, selector: &Selector, separator: &str) -> String {
        document
            .select(selector)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// One entry per variant row that still has options once the placeholder is gone
    fn variants(&self, document: &Html) -> Vec<AdditionalInfo> {
        document
            .select(&self.variant_row)
            .filter_map(|row| {
                let label = row.select(&self.variant_label).next().map(element_text)?;
                let values = row
                    .select(&self.variant_option)
                    .map(element_text)
                    .filter(|v| !v.is_empty() && !is_placeholder(v))
                    .collect();
                AdditionalInfo::new(label, values)
            })
            .collect()
    }
}

fn is_placeholder(option: &str) -> bool {
    option.trim().eq_ignore_ascii_case(PLACEHOLDER_OPTION)
}
