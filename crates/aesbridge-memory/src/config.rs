//! Bridge settings.
use std::path::Path;

use aesbridge_core::TimingModel;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLOCK_HZ: u64 = 48_000_000;
pub const DEFAULT_CYCLES_PER_BLOCK: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Clock parameters of the attached device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    pub clock_hz: u64,
    pub cycles_per_block: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            clock_hz: DEFAULT_CLOCK_HZ,
            cycles_per_block: DEFAULT_CYCLES_PER_BLOCK,
        }
    }
}

impl BridgeConfig {
    /// Read a JSON config; missing fields take their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_hz == 0 {
            return Err(ConfigError::Invalid("clockHz must be positive"));
        }
        if self.cycles_per_block == 0 {
            return Err(ConfigError::Invalid("cyclesPerBlock must be positive"));
        }
        Ok(())
    }

    pub fn timing_model(&self) -> TimingModel {
        TimingModel::new(self.clock_hz, self.cycles_per_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_reference_device() {
        let config = BridgeConfig::default();
        assert_eq!(config.clock_hz, 48_000_000);
        assert_eq!(config.cycles_per_block, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_partial_file() {
        let file = write_config(r#"{ "clockHz": 100000000 }"#);
        let config = BridgeConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.clock_hz, 100_000_000);
        assert_eq!(config.cycles_per_block, DEFAULT_CYCLES_PER_BLOCK);
        assert_eq!(config.timing_model().per_block_seconds(), 1e-7);
    }

    #[test]
    fn rejects_zero_cycles() {
        let file = write_config(r#"{ "cyclesPerBlock": 0 }"#);
        let err = BridgeConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn reports_parse_and_io_errors() {
        let file = write_config("not json");
        assert!(matches!(
            BridgeConfig::load_from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            BridgeConfig::load_from_file(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
