//! Link configuration
//!
//! Stored as JSON next to the panel executable (or wherever the caller points).
//! Every field has a default, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::protocol::{
    serial::default_port_name, ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_READ_CHUNK_SIZE,
};

/// Longest pause allowed between ramp steps
pub const MAX_RAMP_INTERVAL_MS: u64 = 1000;

/// Errors raised while loading or checking configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Speed ramp: how many speed steps to send and how far apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampSettings {
    /// Speed-step commands per ramp
    pub steps: u32,

    /// Delay between steps in milliseconds
    pub interval_ms: u64,
}

impl Default for RampSettings {
    fn default() -> Self {
        Self {
            steps: 5,
            interval_ms: 15,
        }
    }
}

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port name; platform default when unset
    pub port_name: Option<String>,

    /// Baud rate
    pub baud_rate: u32,

    /// Largest single read from the port
    pub read_chunk_size: usize,

    /// Speed ramp used by the +/- buttons
    pub ramp: RampSettings,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port_name: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            ramp: RampSettings::default(),
        }
    }
}

impl LinkConfig {
    /// Parse from JSON text and validate
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: LinkConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be positive".into()));
        }
        if self.read_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "read_chunk_size must be positive".into(),
            ));
        }
        if self.ramp.interval_ms > MAX_RAMP_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "ramp.interval_ms must be at most {}",
                MAX_RAMP_INTERVAL_MS
            )));
        }
        Ok(())
    }

    /// The configured port, or the platform default
    pub fn resolved_port_name(&self) -> Result<String, ProtocolError> {
        match &self.port_name {
            Some(name) if !name.trim().is_empty() => Ok(name.clone()),
            _ => default_port_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.read_chunk_size, 512);
        assert_eq!(config.ramp, RampSettings { steps: 5, interval_ms: 15 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            LinkConfig::from_json(r#"{ "port_name": "/dev/ttyUSB0", "ramp": { "steps": 8 } }"#)
                .unwrap();
        assert_eq!(config.port_name.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.ramp.steps, 8);
        assert_eq!(config.ramp.interval_ms, 15);
    }

    #[test]
    fn test_rejects_zero_baud() {
        let err = LinkConfig::from_json(r#"{ "baud_rate": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_chunk() {
        let err = LinkConfig::from_json(r#"{ "read_chunk_size": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("read_chunk_size"));
    }

    #[test]
    fn test_rejects_slow_ramp() {
        let err = LinkConfig::from_json(r#"{ "ramp": { "interval_ms": 5000 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = LinkConfig::from_json("{ baud_rate: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_explicit_port_wins() {
        let config = LinkConfig {
            port_name: Some("COM7".to_string()),
            ..LinkConfig::default()
        };
        assert_eq!(config.resolved_port_name().unwrap(), "COM7");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.json");
        let config = LinkConfig {
            port_name: Some("/dev/cuaU0".to_string()),
            ramp: RampSettings {
                steps: 3,
                interval_ms: 40,
            },
            ..LinkConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(LinkConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LinkConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
