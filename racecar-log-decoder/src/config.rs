//! Decoder configuration types
//!
//! The message layout is fixed in code; configuration only covers how the log
//! is read and a few policy knobs of the decode pass.

use crate::types::{DecoderError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the decoder library
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecoderConfig {
    /// Whether the first record of the log is a header
    #[serde(default = "default_true")]
    pub skip_header: bool,

    /// Minimum spacing between accepted gyro frames in milliseconds (0 disables)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Optional: only decode these arbitration IDs
    #[serde(default)]
    pub message_filter: Option<Vec<String>>,

    /// Optional: stop after this many data records
    #[serde(default)]
    pub max_frames: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            skip_header: true,
            debounce_ms: default_debounce_ms(),
            message_filter: None,
            max_frames: None,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set whether the first record is skipped
    pub fn with_header(mut self, skip_header: bool) -> Self {
        self.skip_header = skip_header;
        self
    }

    /// Builder method: set the gyro debounce interval
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Builder method: set message filter
    pub fn with_message_filter<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message_filter = Some(messages.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method: cap the number of records decoded
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Check if a message ID should be processed
    pub fn should_process_message(&self, id: &str) -> bool {
        match &self.message_filter {
            Some(messages) => messages.iter().any(|m| m == id),
            None => true,
        }
    }

    /// Reject settings that would make a pass meaningless
    pub fn validate(&self) -> Result<()> {
        if matches!(&self.message_filter, Some(messages) if messages.is_empty()) {
            return Err(DecoderError::InvalidConfig(
                "message_filter must list at least one ID".to_string(),
            ));
        }
        if self.max_frames == Some(0) {
            return Err(DecoderError::InvalidConfig(
                "max_frames must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_header(false)
            .with_debounce_ms(250)
            .with_message_filter(["0x0A5", "0x0A6"])
            .with_max_frames(1000);

        assert!(!config.skip_header);
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.message_filter.as_ref().map(Vec::len), Some(2));
        assert_eq!(config.max_frames, Some(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_filter_logic() {
        let config = DecoderConfig::new().with_message_filter(vec!["0x0A7".to_string()]);
        assert!(config.should_process_message("0x0A7"));
        assert!(!config.should_process_message("0x0A6"));
    }

    #[test]
    fn test_no_filters() {
        let config = DecoderConfig::new();
        assert!(config.should_process_message("0x0A7"));
        assert!(config.should_process_message("anything"));
    }

    #[test]
    fn test_validation() {
        let empty_filter = DecoderConfig::new().with_message_filter(Vec::<String>::new());
        assert!(matches!(empty_filter.validate(), Err(DecoderError::InvalidConfig(_))));

        let zero_frames = DecoderConfig::new().with_max_frames(0);
        assert!(zero_frames.validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let config: DecoderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DecoderConfig::default());
        assert!(config.skip_header);
        assert_eq!(config.debounce_ms, 100);
    }
}
