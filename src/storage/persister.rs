//! Incremental two-store persister

use crate::config::OutputConfig;
use crate::model::Product;
use crate::storage::csv_store::CsvStore;
use crate::storage::json_store::JsonArrayStore;
use crate::storage::traits::{PersistError, PersistResult, Persister};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

struct Stores {
    json: JsonArrayStore,
    csv: CsvStore,
}

/// Appends every product to the JSON array store and the CSV store
///
/// Both writes happen under one lock, so concurrent appends never interleave.
/// The two stores are not updated transactionally: an interruption between
/// the CSV write and the JSON write leaves the CSV one record ahead.
pub struct IncrementalPersister {
    stores: Mutex<Stores>,
    appended: AtomicU64,
}

impl IncrementalPersister {
    /// Opens both stores, writing the CSV header if needed
    ///
    /// # Arguments
    ///
    /// * `output` - Output paths
    /// * `fresh` - Truncate both stores instead of appending to what is there
    pub fn open(output: &OutputConfig, fresh: bool) -> PersistResult<Self> {
        ensure_parent_dir(Path::new(&output.json_path))?;
        ensure_parent_dir(Path::new(&output.csv_path))?;

        let json = JsonArrayStore::new(&output.json_path);
        if fresh {
            json.reset()?;
        }
        let csv = CsvStore::open(&output.csv_path, fresh)?;

        tracing::info!(
            "Persisting to {} and {}",
            json.path().display(),
            csv.path().display()
        );

        Ok(Self {
            stores: Mutex::new(Stores { json, csv }),
            appended: AtomicU64::new(0),
        })
    }
}

impl Persister for IncrementalPersister {
    fn append(&self, product: &Product) -> PersistResult<()> {
        let mut stores = self.stores.lock().map_err(|_| PersistError::Poisoned)?;

        let rows = stores.csv.append(product)?;
        let total = stores.json.append(product)?;
        self.appended.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            "Persisted '{}' ({} csv rows, {} records in array store)",
            product.title,
            rows,
            total
        );
        Ok(())
    }

    fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }
}

fn ensure_parent_dir(path: &Path) -> PersistResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}
