//! Stream metadata probing via `ffprobe`.
//!
//! Shells out to `ffprobe -v error -print_format json -show_format
//! -show_streams` and maps the JSON output into [`StreamInfo`]. The
//! [`EncodeProfile`] comparison backs the transform stage's fast-path skip:
//! a clip already at the canonical resolution and frame rate is not
//! re-encoded.

use std::path::Path;

use serde::Deserialize;

use crate::command::ToolCommand;
use crate::tools::Tool;

/// Video stream properties of a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate in frames per second.
    pub frame_rate: f64,
    /// Container duration in seconds, if reported.
    pub duration_seconds: Option<f64>,
}

/// The canonical encoding profile clips are normalized to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeProfile {
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Target frame rate.
    pub frame_rate: u32,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 30,
        }
    }
}

impl EncodeProfile {
    /// True when a probed stream already conforms to this profile, so the
    /// re-encode can be skipped.
    pub fn matches(&self, info: &StreamInfo) -> bool {
        info.width == self.width
            && info.height == self.height
            && info.frame_rate.round() as u32 == self.frame_rate
    }

    /// The ffmpeg `WxH` size string for this profile.
    pub fn size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Probe the first video stream of `path`.
///
/// # Errors
///
/// [`rf_core::Error::Tool`] if ffprobe fails or times out,
/// [`rf_core::Error::Probe`] if its output cannot be parsed or the file has
/// no video stream.
pub async fn probe(ffprobe: &Tool, path: &Path) -> rf_core::Result<StreamInfo> {
    let output = ToolCommand::new(ffprobe.path.clone())
        .timeout(ffprobe.timeout)
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path.to_string_lossy())
        .run()
        .await?;

    let parsed: FfprobeOutput = serde_json::from_str(&output.stdout)
        .map_err(|e| rf_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    stream_info(parsed).ok_or_else(|| {
        rf_core::Error::Probe(format!("no video stream in {}", path.display()))
    })
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

fn stream_info(output: FfprobeOutput) -> Option<StreamInfo> {
    let duration_seconds = output
        .format
        .and_then(|f| f.duration)
        .and_then(|s| s.parse::<f64>().ok());

    let video = output
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))?;

    Some(StreamInfo {
        width: video.width?,
        height: video.height?,
        frame_rate: video.r_frame_rate.as_deref().and_then(parse_frame_rate)?,
        duration_seconds,
    })
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.parse().ok()
}
