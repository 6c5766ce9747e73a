//! Clip acquisition via yt-dlp.
//!
//! Two operations back the harvest stage: duration resolution (unknown
//! durations come back as `0`, which the harvester treats as a skip) and
//! the download itself, which overwrites partial output so every retry
//! attempt is independent and idempotent at the target file.

use std::path::{Path, PathBuf};

use crate::command::ToolCommand;
use crate::tools::Tool;

/// yt-dlp invocation wrapper.
#[derive(Debug, Clone)]
pub struct YtDlp {
    tool: Tool,
    cookies_file: Option<PathBuf>,
}

impl YtDlp {
    /// Create a wrapper around a discovered yt-dlp tool.
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            cookies_file: None,
        }
    }

    /// Pass a cookies file to every invocation (some hosts require it).
    pub fn with_cookies(mut self, cookies_file: PathBuf) -> Self {
        self.cookies_file = Some(cookies_file);
        self
    }

    fn base_command(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.tool.path.clone());
        cmd.timeout(self.tool.timeout);
        if let Some(ref cookies) = self.cookies_file {
            cmd.arg("--cookies").arg(cookies.to_string_lossy());
        }
        cmd
    }

    /// Resolve the duration of the media at `url` in whole seconds.
    ///
    /// Returns `0` when the duration is unknown or unparsable; tool
    /// failures propagate as [`rf_core::Error::Tool`].
    pub async fn duration(&self, url: &str) -> rf_core::Result<u64> {
        let output = self
            .base_command()
            .args(["--print", "duration"])
            .arg(url)
            .run()
            .await?;

        // yt-dlp prints a float ("12.0") or "NA" for unknown durations.
        let seconds = output
            .stdout
            .trim()
            .parse::<f64>()
            .map(|d| d.round() as u64)
            .unwrap_or(0);

        Ok(seconds)
    }

    /// Download the media at `url` to exactly `dest`, overwriting any
    /// partial file from a previous attempt.
    pub async fn download(&self, url: &str, dest: &Path) -> rf_core::Result<()> {
        self.base_command()
            .args(["--quiet", "--force-overwrites", "--output"])
            .arg(dest.to_string_lossy())
            .arg(url)
            .run()
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fake_tool(path: &str) -> Tool {
        Tool {
            name: "yt-dlp".into(),
            path: PathBuf::from(path),
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn duration_parses_float_output() {
        // `echo` stands in for yt-dlp: `echo --print duration <url>` prints
        // the args, which does not parse, but a direct float check covers
        // the parse path without the tool installed.
        assert_eq!("12.0".trim().parse::<f64>().map(|d| d.round() as u64).unwrap_or(0), 12);
        assert_eq!("NA".trim().parse::<f64>().map(|d| d.round() as u64).unwrap_or(0), 0);
        assert_eq!("29.7".trim().parse::<f64>().map(|d| d.round() as u64).unwrap_or(0), 30);
    }

    #[tokio::test]
    async fn download_spawn_failure_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = YtDlp::new(fake_tool("nonexistent_ytdlp_xyz"));
        let result = ytdlp
            .download("https://example.com/v", &dir.path().join("0.mp4"))
            .await;
        assert!(matches!(result, Err(rf_core::Error::Tool { .. })));
    }

    #[test]
    fn cookies_flag_is_prepended() {
        let ytdlp =
            YtDlp::new(fake_tool("yt-dlp")).with_cookies(PathBuf::from("/home/u/cookies.txt"));
        assert_eq!(ytdlp.cookies_file, Some(PathBuf::from("/home/u/cookies.txt")));
    }
}
