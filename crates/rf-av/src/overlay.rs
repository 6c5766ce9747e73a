//! Caption overlay rendering via ffmpeg drawtext.
//!
//! Renders the clip's original title as white text over a semi-transparent
//! black box, horizontally centered at 85% of the frame height. The video
//! is re-encoded (drawtext cannot stream-copy) but audio passes through.

use std::path::Path;

use crate::command::ToolCommand;
use crate::tools::Tool;

/// Burn `text` into `src`, writing the captioned clip to `dest`.
pub async fn overlay_caption(
    ffmpeg: &Tool,
    src: &Path,
    dest: &Path,
    text: &str,
) -> rf_core::Result<()> {
    let filter = format!(
        "drawtext=text='{}':fontcolor=white:fontsize=36:borderw=2:bordercolor=black:\
         box=1:boxcolor=black@0.6:boxborderw=10:x=(w-text_w)/2:y=h*0.85",
        escape_drawtext(text)
    );

    ToolCommand::new(ffmpeg.path.clone())
        .timeout(ffmpeg.timeout)
        .arg("-i")
        .arg(src.to_string_lossy())
        .arg("-vf")
        .arg(filter)
        .args(["-c:v", "libx264", "-preset", "fast", "-c:a", "copy"])
        .arg("-y")
        .arg(dest.to_string_lossy())
        .run()
        .await?;

    Ok(())
}

/// Escape text for use inside a single-quoted drawtext `text=` value.
///
/// Backslash, the quote itself, and the filter metacharacters `:`, `%`,
/// `,`, `;`, `[` and `]` all need escaping or ffmpeg misparses the filter
/// graph.
pub fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\\\\\'"),
            ':' | '%' | ',' | ';' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
