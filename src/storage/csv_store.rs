//! Tabular store
//!
//! Each product is written as one row carrying its scalar fields, followed by
//! one row per `AdditionalInfo` carrying only `additional_label` and
//! `additional_values`. Title is never empty on a product row, so a row with
//! an empty title always belongs to the product row above it.

use crate::model::Product;
use crate::storage::traits::PersistResult;
use csv::{Writer, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Column layout of the tabular store
pub const CSV_HEADERS: [&str; 9] = [
    "title",
    "image",
    "price",
    "sku",
    "short_description",
    "description",
    "category",
    "additional_label",
    "additional_values",
];

/// Separator between option values inside `additional_values`
pub const VALUES_SEPARATOR: &str = " | ";

/// Append-only CSV file of products
pub struct CsvStore {
    path: PathBuf,
    writer: Writer<File>,
}

impl CsvStore {
    /// Opens the store for appending
    ///
    /// The header row is written when the file is new or empty, or when
    /// `fresh` truncates it. A file left ending mid-row by an interrupted run
    /// gets its line terminated so the next record starts on its own line.
    pub fn open(path: impl Into<PathBuf>, fresh: bool) -> PersistResult<Self> {
        let path = path.into();
        let needs_header = fresh || fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let mut file = if fresh {
            File::create(&path)?
        } else {
            OpenOptions::new().create(true).append(true).open(&path)?
        };

        if !needs_header && !ends_with_newline(&path)? {
            tracing::warn!(
                "Tabular store {} ends mid-row, terminating the partial row",
                path.display()
            );
            file.write_all(b"\n")?;
        }

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(CSV_HEADERS)?;
            writer.flush()?;
        }

        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a product's row group and returns the number of rows written
    pub fn append(&mut self, product: &Product) -> PersistResult<usize> {
        let rows = product_rows(product);
        for row in &rows {
            self.writer.write_record(row)?;
        }
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(rows.len())
    }
}

fn ends_with_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Flattens a product into its row group
pub fn product_rows(product: &Product) -> Vec<[String; 9]> {
    let mut rows = Vec::with_capacity(1 + product.additional.len());
    rows.push([
        product.title.clone(),
        product.image_url.clone(),
        product.price.clone(),
        product.sku.clone(),
        product.short_description.clone(),
        product.description.clone(),
        product.category.clone(),
        String::new(),
        String::new(),
    ]);

    for info in &product.additional {
        let mut row: [String; 9] = Default::default();
        row[7] = info.label.clone();
        row[8] = info.values.join(VALUES_SEPARATOR);
        rows.push(row);
    }

    rows
}
