//! Journal storage — date-partitioned JSON files.
//!
//! Records are laid out as `{root}/YYYY/MM/DD/{run_id}.json`, so the
//! directory can be kept under version control or rotated by date.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{RunId, RunRecord};

/// Errors that can occur during journal storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Run record not found: {0}")]
    NotFound(RunId),

    #[error("Integrity check failed for run {0}: stored hash does not match content")]
    IntegrityViolation(RunId),

    #[error("Run record has no content hash (not finalized)")]
    NotFinalized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// File-system backed store for run records.
pub struct JournalStore {
    root: PathBuf,
}

impl JournalStore {
    /// Create a store rooted at the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store a finalized record. Rejects records without a content hash.
    pub fn save(&self, record: &RunRecord) -> Result<(), StoreError> {
        if record.content_hash.is_none() {
            return Err(StoreError::NotFinalized);
        }

        let path = self.record_path(record);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;

        tracing::debug!(
            run_id = %record.id,
            path = %path.display(),
            "Run journal saved"
        );

        Ok(())
    }

    /// Retrieve a record by run ID, verifying integrity.
    pub fn load(&self, id: RunId) -> Result<RunRecord, StoreError> {
        let filename = format!("{}.json", id.0);
        let path =
            find_file_recursive(&self.root, &filename).ok_or(StoreError::NotFound(id))?;
        let json = fs::read_to_string(&path)?;
        let record: RunRecord = serde_json::from_str(&json)?;

        if !record.verify_integrity() {
            return Err(StoreError::IntegrityViolation(id));
        }

        Ok(record)
    }

    fn record_path(&self, record: &RunRecord) -> PathBuf {
        let date = record.started_at.format("%Y/%m/%d");
        self.root.join(format!("{}/{}.json", date, record.id.0))
    }
}

/// Recursively find a file by name.
fn find_file_recursive(dir: &Path, filename: &str) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }

    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Some(found) = find_file_recursive(&path, filename) {
                return Some(found);
            }
        } else if path.file_name().and_then(|n| n.to_str()) == Some(filename) {
            return Some(path);
        }
    }

    None
}
