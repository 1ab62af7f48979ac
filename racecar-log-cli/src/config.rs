//! Configuration loading and parsing

use anyhow::{Context, Result};
use racecar_log_decoder::DecoderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Write the decoded dataset as JSON to this path
    pub json: Option<PathBuf>,
    /// Restrict the summary to these channel or group names
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .decoder
        .validate()
        .with_context(|| format!("Invalid decoder settings in {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [decoder]
            debounce_ms = 50
            message_filter = ["0x0A5", "0x0A6"]

            [output]
            json = "out.json"
            channels = ["Speed", "BMS Cell"]
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.decoder.debounce_ms, 50);
        assert!(config.decoder.skip_header);
        assert_eq!(config.decoder.message_filter.as_ref().map(Vec::len), Some(2));
        assert_eq!(config.output.json, Some(PathBuf::from("out.json")));
        assert_eq!(config.output.channels.len(), 2);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.decoder, DecoderConfig::default());
        assert!(config.output.json.is_none());
    }

    #[test]
    fn test_load_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[decoder]\nmax_frames = 0\n").unwrap();
        assert!(load_config(&path).is_err());

        fs::write(&path, "[decoder]\nmax_frames = 10\n").unwrap();
        assert_eq!(load_config(&path).unwrap().decoder.max_frames, Some(10));
    }
}
