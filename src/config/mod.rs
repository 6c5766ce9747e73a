pub mod channels;
mod types;

pub use channels::{ChannelStore, UploadDetails};
pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./reelforged.toml",
        "~/.config/reelforged/config.toml",
        "/etc/reelforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration.
fn validate_config(config: &Config) -> Result<()> {
    if config.transform.workers == 0 {
        anyhow::bail!("transform.workers cannot be 0");
    }
    if config.publish.workers == 0 {
        anyhow::bail!("publish.workers cannot be 0");
    }
    if config.harvest.retry_attempts == 0 {
        anyhow::bail!("harvest.retry_attempts cannot be 0");
    }
    if config.transform.width == 0 || config.transform.height == 0 {
        anyhow::bail!("transform resolution cannot be 0");
    }

    if chrono::NaiveTime::parse_from_str(&config.publish.publish_time, "%H:%M:%S").is_err() {
        anyhow::bail!(
            "publish.publish_time '{}' is not a valid HH:MM:SS time",
            config.publish.publish_time
        );
    }

    if config.publish.timezone.parse::<chrono_tz::Tz>().is_err() {
        anyhow::bail!("publish.timezone '{}' is not a known timezone", config.publish.timezone);
    }

    if config.storage.enabled && config.storage.endpoint.is_empty() {
        anyhow::bail!("storage is enabled but storage.endpoint is empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.harvest.max_clip_seconds, 30);
        assert_eq!(config.transform.workers, 4);
        assert_eq!(config.publish.publish_time, "12:00:00");
        assert_eq!(config.publish.timezone, "US/Pacific");
    }

    #[test]
    fn parses_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[harvest]
max_clip_seconds = 45

[transform]
workers = 2
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.harvest.max_clip_seconds, 45);
        assert_eq!(config.transform.workers, 2);
        // Untouched sections keep their defaults.
        assert_eq!(config.transform.height, 720);
        assert_eq!(config.publish.workers, 4);
    }

    #[test]
    fn rejects_zero_workers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transform]\nworkers = 0").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_bad_publish_time() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[publish]\npublish_time = \"noon\"").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_unknown_timezone() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[publish]\ntimezone = \"Mars/Olympus\"").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_enabled_storage_without_endpoint() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\nenabled = true").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
