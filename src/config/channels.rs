//! Per-channel publishing configuration and the episode counter.
//!
//! Channels live in a flat JSON file keyed by channel identifier. The
//! episode counter is owned here: every call to
//! [`ChannelStore::next_upload_details`] hands out the current number and
//! persists the increment before returning, so numbers are strictly
//! increasing per channel across runs and read once per record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::schedule;

/// One channel's configured publishing destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelRecord {
    /// Title prefix; the episode number is appended at publish time.
    pub title: String,
    pub description: String,
    /// Hosting platform category identifier.
    pub category: String,
    #[serde(default = "default_privacy")]
    pub privacy: String,
    /// Next episode number to hand out.
    pub episode: u64,
    /// Harvest duration budget for this channel, in seconds.
    #[serde(default = "default_duration")]
    pub duration_in_seconds: u64,
    /// Weekday name the channel publishes on (e.g. "Monday").
    pub publish_day: String,
}

fn default_privacy() -> String {
    "private".to_string()
}
fn default_duration() -> u64 {
    600
}

/// Everything the publish call needs for one artifact.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UploadDetails {
    /// Display title with the episode number appended.
    pub title: String,
    pub description: String,
    pub category: String,
    pub privacy: String,
    pub episode: u64,
    /// Harvest budget carried along for the pipeline run.
    pub duration_seconds: u64,
    /// Absolute instant the artifact goes live.
    pub publish_at: DateTime<Utc>,
}

/// JSON-file-backed store of [`ChannelRecord`]s.
#[derive(Debug, Clone)]
pub struct ChannelStore {
    path: PathBuf,
}

impl ChannelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load all channel records.
    pub fn load(&self) -> rf_core::Result<BTreeMap<String, ChannelRecord>> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, records: &BTreeMap<String, ChannelRecord>) -> rf_core::Result<()> {
        let content = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Look up a channel without consuming an episode number.
    pub fn get(&self, channel: &str) -> rf_core::Result<ChannelRecord> {
        self.load()?
            .remove(channel)
            .ok_or_else(|| rf_core::Error::not_found("channel", channel))
    }

    /// Build the upload details for the channel's next episode.
    ///
    /// Consumes the current episode number (the increment is persisted
    /// before this returns) and computes the publish instant as the next
    /// occurrence of the channel's weekday at `publish_time` in `tz`.
    pub fn next_upload_details(
        &self,
        channel: &str,
        publish_time: NaiveTime,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> rf_core::Result<UploadDetails> {
        let mut records = self.load()?;
        let record = records
            .get_mut(channel)
            .ok_or_else(|| rf_core::Error::not_found("channel", channel))?;

        let episode = record.episode;
        record.episode += 1;

        let publish_at =
            schedule::next_publish_instant(&record.publish_day, publish_time, tz, now)?;

        let details = UploadDetails {
            title: format!("{}{}", record.title, episode),
            description: record.description.clone(),
            category: record.category.clone(),
            privacy: record.privacy.clone(),
            episode,
            duration_seconds: record.duration_in_seconds,
            publish_at,
        };

        self.save(&records)?;
        Ok(details)
    }

    /// Path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
