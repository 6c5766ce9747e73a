//! The publish batch queue.
//!
//! Finished compilations wait in a flat JSON file until dispatch. Records
//! that fail to publish are requeued so the next dispatch retries them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use rf_core::{Error, Result};

use crate::config::UploadDetails;

/// One queued compilation awaiting publication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishRecord {
    pub artifact_path: PathBuf,
    pub details: UploadDetails,
}

/// File-backed queue of [`PublishRecord`]s.
pub struct BatchQueue {
    path: PathBuf,
}

impl BatchQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// All queued records; a missing queue file is an empty queue.
    pub fn load(&self) -> Result<Vec<PublishRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, records: &[PublishRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Append a record, verifying the artifact exists and is non-empty.
    pub fn enqueue(&self, record: PublishRecord) -> Result<()> {
        let meta = std::fs::metadata(&record.artifact_path).map_err(|_| Error::NotFound {
            entity: "artifact".into(),
            id: record.artifact_path.display().to_string(),
        })?;
        if meta.len() == 0 {
            return Err(Error::invalid(format!(
                "artifact {} is empty",
                record.artifact_path.display()
            )));
        }
        let mut records = self.load()?;
        records.push(record);
        self.save(&records)
    }

    /// Drain the queue, leaving it empty on disk.
    pub fn take_all(&self) -> Result<Vec<PublishRecord>> {
        let records = self.load()?;
        self.save(&[])?;
        Ok(records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
