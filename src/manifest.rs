//! The harvest run's metadata side-record.
//!
//! Maps clip filename to the original feed title, persisted as
//! `metadata.json` next to the raw clips. Written once per successful
//! download by the harvester, read-only thereafter by the transform stage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Caption used when a clip has no manifest entry.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

const MANIFEST_FILE: &str = "metadata.json";

/// Filename → original title side-record for one harvest folder.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Create an empty manifest for `folder`.
    pub fn new(folder: &Path) -> Self {
        Self {
            path: folder.join(MANIFEST_FILE),
            entries: BTreeMap::new(),
        }
    }

    /// Load the manifest from `folder`; a missing file is an empty record.
    pub fn load(folder: &Path) -> rf_core::Result<Self> {
        let path = folder.join(MANIFEST_FILE);
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    /// Record a clip's original title and persist immediately, so a run
    /// interrupted mid-harvest keeps the entries for every clip it already
    /// downloaded.
    pub fn record(&mut self, filename: impl Into<String>, title: impl Into<String>) -> rf_core::Result<()> {
        self.entries.insert(filename.into(), title.into());
        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// The original title for `filename`, or [`UNKNOWN_TITLE`].
    pub fn title_for(&self, filename: &str) -> &str {
        self.entries
            .get(filename)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_TITLE)
    }

    /// Number of recorded clips.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no clip was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
