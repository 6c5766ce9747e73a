//! Unified error type for the reelforged pipeline.
//!
//! All crates funnel their failures into [`Error`]. Per-item failures during
//! harvest and publish are caught at the item boundary by the callers; only
//! stage-level variants ([`Error::NoValidClips`], [`Error::Auth`]) are meant
//! to propagate past a whole stage.

use std::fmt;
use std::path::PathBuf;

/// Unified error type covering all failure modes in reelforged.
///
/// A rejected budget is intentionally *not* represented here: running out of
/// harvest budget is the normal termination signal for the harvest loop, not
/// a failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required input was missing or empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "channel").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An HTTP call to an external collaborator failed.
    #[error("HTTP error: {source}")]
    Http {
        /// The underlying reqwest error.
        #[from]
        source: reqwest::Error,
    },

    /// An external tool (ffmpeg, ffprobe, yt-dlp) returned an error,
    /// failed to spawn, or timed out.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Stream metadata could not be read or parsed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// The transform stage produced zero usable clips.
    #[error("no usable clips in {}", folder.display())]
    NoValidClips {
        /// The harvest folder that yielded nothing.
        folder: PathBuf,
    },

    /// Authentication with the hosting platform failed; aborts a whole
    /// dispatch batch since no item can proceed without a session.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serde_json error.
        #[from]
        source: serde_json::Error,
    },

    /// Configuration content was invalid.
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Convenience constructor for [`Error::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// True for failure modes that a retry policy may reasonably retry:
    /// transient external calls (HTTP, tool invocations including timeouts,
    /// I/O). Argument and configuration errors are permanent.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io { .. } | Error::Http { .. } | Error::Tool { .. }
        )
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_display() {
        let err = Error::invalid("channel must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid argument: channel must not be empty"
        );
    }

    #[test]
    fn not_found_display() {
        let err = Error::not_found("channel", "funnyvideos");
        assert_eq!(err.to_string(), "channel not found: funnyvideos");
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exited with status 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exited with status 1");
        assert!(err.is_transient());
    }

    #[test]
    fn no_valid_clips_display() {
        let err = Error::NoValidClips {
            folder: PathBuf::from("/tmp/run"),
        };
        assert_eq!(err.to_string(), "no usable clips in /tmp/run");
        assert!(!err.is_transient());
    }

    #[test]
    fn auth_display() {
        let err = Error::Auth("token rejected".into());
        assert_eq!(err.to_string(), "Authentication failed: token rejected");
        assert!(!err.is_transient());
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn invalid_is_permanent() {
        assert!(!Error::invalid("x").is_transient());
        assert!(!Error::Config("bad".into()).is_transient());
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(7)
        }
        assert_eq!(ok_fn().unwrap(), 7);
    }
}
