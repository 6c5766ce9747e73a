//! Re-encoding clips to the canonical profile via ffmpeg.

use std::path::Path;

use crate::command::ToolCommand;
use crate::probe::EncodeProfile;
use crate::tools::Tool;

/// Re-encode `src` into `dest` at the given profile.
///
/// Scales to the profile height preserving aspect ratio and pads with
/// centered black bars to the exact profile box, forces the profile frame
/// rate, and encodes as H.264 video with AAC audio. `-y` makes the
/// operation idempotent on retry (partial output is overwritten).
pub async fn reencode(
    ffmpeg: &Tool,
    src: &Path,
    dest: &Path,
    profile: &EncodeProfile,
) -> rf_core::Result<()> {
    let filter = format!(
        "scale=-1:{h},pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
        w = profile.width,
        h = profile.height,
    );

    ToolCommand::new(ffmpeg.path.clone())
        .timeout(ffmpeg.timeout)
        .arg("-i")
        .arg(src.to_string_lossy())
        .args(["-c:v", "libx264", "-c:a", "aac", "-b:a", "192k", "-preset", "fast"])
        .arg("-r")
        .arg(profile.frame_rate.to_string())
        .arg("-s")
        .arg(profile.size())
        .arg("-vf")
        .arg(filter)
        .arg("-y")
        .arg(dest.to_string_lossy())
        .run()
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_filter_centers_canonical_box() {
        let profile = EncodeProfile::default();
        let filter = format!(
            "scale=-1:{h},pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
            w = profile.width,
            h = profile.height,
        );
        assert_eq!(filter, "scale=-1:720,pad=1280:720:(ow-iw)/2:(oh-ih)/2");
    }
}
