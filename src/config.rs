//! TOML configuration for the engine.
//!
//! Every section is optional; missing keys fall back to their defaults.
//!
//! ```toml
//! [market_profile]
//! block_size = "30m"
//! tick_size = "auto"
//! value_area_percent = 70.0
//!
//! [render]
//! showPoc = true
//! position = "right"
//!
//! [logging]
//! level_filter = "info,market_profile=debug"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::logging::LoggingConfig;
use crate::market_profile::MarketProfileConfig;
use crate::render::RenderOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub market_profile: MarketProfileConfig,
    pub render: RenderOptions,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.market_profile
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("market_profile: {}", e)))?;
        self.render
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("render: {}", e)))?;
        self.logging
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("logging: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogRotation;
    use crate::market_profile::{BlockSize, TickSizeSetting};
    use crate::render::ProfilePosition;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[market_profile]
block_size = "1h"
tick_size = 0.5
value_area_percent = 68.0

[render]
position = "right"
showMidpoint = false

[logging]
level_filter = "debug"
rotation = "never"
"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.market_profile.block_size, BlockSize::H1);
        assert_eq!(config.market_profile.tick_size, TickSizeSetting::Fixed(0.5));
        assert_eq!(config.market_profile.value_area_percent, 68.0);
        assert_eq!(config.market_profile.ib_periods, 1);
        assert_eq!(config.render.position, ProfilePosition::Right);
        assert!(!config.render.show_midpoint);
        assert!(config.render.show_poc);
        assert_eq!(config.logging.rotation, LogRotation::Never);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml_str("[market_profile]\nvalue_area_percent = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.starts_with("market_profile")));

        let err = EngineConfig::from_toml_str("[render]\nletterWidth = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load("/nonexistent/market_profile.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = EngineConfig::from_toml_str("[market_profile\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
