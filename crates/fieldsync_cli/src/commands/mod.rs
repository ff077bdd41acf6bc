//! CLI command implementations.

pub mod conflicts;
pub mod pending;
pub mod records;
pub mod status;

use fieldsync_store::{FileBackend, LocalStore};
use std::path::Path;
use tracing::debug;

/// Opens the local store at a data directory, refusing directories that
/// hold no FieldSync data at all.
pub fn open_store(path: &Path) -> Result<LocalStore, Box<dyn std::error::Error>> {
    if !path.is_dir() {
        return Err(format!("No data directory at {:?}", path).into());
    }
    debug!(path = %path.display(), "opening data directory");
    let backend = FileBackend::open(path)?;
    Ok(LocalStore::new(backend))
}
