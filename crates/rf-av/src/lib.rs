//! External tool layer for reelforged.
//!
//! Wraps the CLI tools the pipeline shells out to (`ffmpeg`, `ffprobe` and
//! `yt-dlp`) behind timeout-bounded invocations. Nothing in this crate may
//! block indefinitely: every subprocess call goes through [`ToolCommand`],
//! which kills overruns and maps them to [`rf_core::Error::Tool`].

pub mod acquire;
pub mod command;
pub mod concat;
pub mod encode;
pub mod overlay;
pub mod probe;
pub mod tools;

pub use acquire::YtDlp;
pub use command::{ToolCommand, ToolOutput};
pub use concat::concat;
pub use encode::reencode;
pub use probe::{probe, EncodeProfile, StreamInfo};
pub use tools::{Tool, ToolInfo, ToolRegistry};
