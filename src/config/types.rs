use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub harvest: HarvestConfig,

    #[serde(default)]
    pub transform: TransformConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Override path to ffmpeg (searched in PATH when unset).
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Override path to ffprobe.
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Override path to yt-dlp.
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Maximum seconds a single tool invocation may run.
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

fn default_tool_timeout() -> u64 {
    300
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            ytdlp_path: None,
            timeout_secs: default_tool_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarvestConfig {
    /// Root directory harvest runs are created under.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Per-clip duration ceiling in seconds; longer clips are skipped.
    #[serde(default = "default_max_clip_seconds")]
    pub max_clip_seconds: u64,

    /// Pause between feed candidates, respecting the feed's rate limits.
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,

    /// Download attempts per clip before the clip is skipped.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay in seconds between download attempts.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Feed ranking window ("week", "day", ...) or "hot".
    #[serde(default = "default_feed_mode")]
    pub feed_mode: String,

    /// Cookies file handed to the acquisition tool, if the feed needs it.
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_max_clip_seconds() -> u64 {
    30
}
fn default_pause_secs() -> u64 {
    2
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff_secs() -> u64 {
    5
}
fn default_feed_mode() -> String {
    "week".to_string()
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_clip_seconds: default_max_clip_seconds(),
            pause_secs: default_pause_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_secs: default_retry_backoff_secs(),
            feed_mode: default_feed_mode(),
            cookies_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransformConfig {
    /// Concurrent normalize workers.
    #[serde(default = "default_transform_workers")]
    pub workers: usize,

    /// Canonical output width.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Canonical output height.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Canonical output frame rate.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

fn default_transform_workers() -> usize {
    4
}
fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    720
}
fn default_frame_rate() -> u32 {
    30
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            workers: default_transform_workers(),
            width: default_width(),
            height: default_height(),
            frame_rate: default_frame_rate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    /// Concurrent upload dispatch workers.
    #[serde(default = "default_publish_workers")]
    pub workers: usize,

    /// Local time of day artifacts go live at, "HH:MM:SS".
    #[serde(default = "default_publish_time")]
    pub publish_time: String,

    /// Reference timezone the publish time is interpreted in.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Flat batch file bridging transform and publish runs.
    #[serde(default = "default_batch_path")]
    pub batch_path: PathBuf,

    /// Keep local artifacts after a successful publish.
    #[serde(default = "default_keep_local")]
    pub keep_local: bool,

    /// Hosting platform API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Pre-provisioned OAuth bearer token for the hosting platform.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-channel upload metadata records.
    #[serde(default = "default_channels_path")]
    pub channels_path: PathBuf,
}

fn default_publish_workers() -> usize {
    4
}
fn default_publish_time() -> String {
    "12:00:00".to_string()
}
fn default_timezone() -> String {
    "US/Pacific".to_string()
}
fn default_batch_path() -> PathBuf {
    PathBuf::from("output/batch_upload.json")
}
fn default_keep_local() -> bool {
    true
}
fn default_api_base() -> String {
    "https://www.googleapis.com".to_string()
}
fn default_channels_path() -> PathBuf {
    PathBuf::from("channels.json")
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            workers: default_publish_workers(),
            publish_time: default_publish_time(),
            timezone: default_timezone(),
            batch_path: default_batch_path(),
            keep_local: default_keep_local(),
            api_base: default_api_base(),
            token: None,
            channels_path: default_channels_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Archive composite artifacts to object storage after transform.
    #[serde(default)]
    pub enabled: bool,

    /// Object store endpoint URL.
    #[serde(default)]
    pub endpoint: String,

    /// Bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Bearer token for the object store, if required.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_bucket() -> String {
    "rscraped".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            bucket: default_bucket(),
            token: None,
        }
    }
}
