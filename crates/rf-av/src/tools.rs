//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools the pipeline needs (ffmpeg, ffprobe, yt-dlp) and provides
//! lookup methods for the rest of the crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default tool timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Known tool names that the registry manages.
pub const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe", "yt-dlp"];

/// A discovered tool: resolved path plus its execution timeout.
#[derive(Debug, Clone)]
pub struct Tool {
    /// Tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    /// Maximum execution time before an invocation is killed.
    pub timeout: Duration,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of version output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool locations.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH`, with optional per-tool overrides.
    ///
    /// For each known tool, if an override path is supplied **and** exists
    /// on disk it is used directly; otherwise [`which::which`] locates the
    /// tool in `PATH`. Tools that are not found are omitted from the
    /// registry and surface later through [`ToolRegistry::require`].
    pub fn discover(
        overrides: &HashMap<&str, Option<&Path>>,
        timeout: Duration,
    ) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom = overrides.get(name).copied().flatten();

            let resolved = match custom {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                // Override missing on disk; fall back to PATH.
                _ => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tools.insert(
                    name.to_string(),
                    Tool {
                        name: name.to_string(),
                        path,
                        timeout,
                    },
                );
            }
        }

        Self { tools }
    }

    /// Discover all tools from `PATH` with the default timeout.
    pub fn from_path() -> Self {
        Self::discover(&HashMap::new(), DEFAULT_TIMEOUT)
    }

    /// Return the [`Tool`] for the given name, or an
    /// [`rf_core::Error::Tool`] if it was not found during discovery.
    pub fn require(&self, name: &str) -> rf_core::Result<&Tool> {
        self.tools.get(name).ok_or_else(|| {
            rf_core::Error::tool(name, format!("{name} not found; is it installed and in PATH?"))
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(tool) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(name, &tool.path),
                    path: Some(tool.path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> --version` (or `-version` for the ffmpeg family) and return
/// the first line of stdout.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };

    let output = std::process::Command::new(path)
        .arg(version_arg)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
