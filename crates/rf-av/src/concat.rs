//! Frame-accurate concatenation via the ffmpeg concat demuxer.
//!
//! All inputs are normalized to the canonical profile before this stage, so
//! stream copy joins them without re-encoding or timestamp gaps. Input
//! order is preserved exactly as given.

use std::path::{Path, PathBuf};

use crate::command::ToolCommand;
use crate::tools::Tool;

/// Concatenate `clips` (in the given order) into `dest`.
///
/// # Errors
///
/// [`rf_core::Error::InvalidArgument`] for an empty clip list;
/// [`rf_core::Error::Tool`] if ffmpeg fails.
pub async fn concat(ffmpeg: &Tool, clips: &[PathBuf], dest: &Path) -> rf_core::Result<()> {
    if clips.is_empty() {
        return Err(rf_core::Error::invalid("concat requires at least one clip"));
    }

    let list_path = dest.with_extension("txt");
    tokio::fs::write(&list_path, concat_list(clips)).await?;

    let result = ToolCommand::new(ffmpeg.path.clone())
        .timeout(ffmpeg.timeout)
        .args(["-f", "concat", "-safe", "0", "-i"])
        .arg(list_path.to_string_lossy())
        .args(["-c", "copy"])
        .arg("-y")
        .arg(dest.to_string_lossy())
        .run()
        .await;

    let _ = tokio::fs::remove_file(&list_path).await;
    result?;

    Ok(())
}

/// Render the concat demuxer list file: one `file '<path>'` line per clip,
/// with single quotes escaped the way the demuxer expects.
fn concat_list(clips: &[PathBuf]) -> String {
    let mut out = String::new();
    for clip in clips {
        let path = clip.to_string_lossy().replace('\'', "'\\''");
        out.push_str("file '");
        out.push_str(&path);
        out.push_str("'\n");
    }
    out
}
