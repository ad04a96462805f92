//! Structured-array store
//!
//! The whole file is one pretty-printed JSON array, so every append reads
//! the array back, pushes the new record, and rewrites the file. Cost grows
//! with the number of records already stored.

use crate::model::Product;
use crate::storage::traits::PersistResult;
use serde_json::Value;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// JSON array of products on disk
#[derive(Debug, Clone)]
pub struct JsonArrayStore {
    path: PathBuf,
}

impl JsonArrayStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every stored product
    ///
    /// A missing, empty, or unparseable file reads as an empty array. Entries
    /// that do not fit the current record layout are skipped.
    pub fn load(&self) -> PersistResult<Vec<Product>> {
        let entries = self.load_entries()?;
        let total = entries.len();
        let products: Vec<Product> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();

        if products.len() < total {
            tracing::warn!(
                "Skipped {} entries in {} that are not product records",
                total - products.len(),
                self.path.display()
            );
        }
        Ok(products)
    }

    /// Reads the stored array without interpreting its entries
    ///
    /// Only content that is not a JSON array at all reads as empty; a
    /// well-formed array is kept whole whatever its entries look like.
    fn load_entries(&self) -> PersistResult<Vec<Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&content) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(_) => {
                tracing::warn!(
                    "Structured store {} does not hold an array, starting a new one",
                    self.path.display()
                );
                Ok(Vec::new())
            }
            Err(e) => {
                tracing::warn!(
                    "Structured store {} is not valid JSON ({}), starting a new one",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Appends one product and returns the new record count
    pub fn append(&self, product: &Product) -> PersistResult<usize> {
        let mut entries = self.load_entries()?;
        entries.push(serde_json::to_value(product)?);
        self.write_all(&entries)?;
        Ok(entries.len())
    }

    /// Replaces the store with an empty array
    pub fn reset(&self) -> PersistResult<()> {
        self.write_all(&[])
    }

    /// Writes through a sibling temp file and renames it into place
    fn write_all(&self, entries: &[Value]) -> PersistResult<()> {
        let mut json = serde_json::to_string_pretty(entries)?;
        json.push('\n');

        let tmp_path = self.tmp_path();
        let mut file = File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}
