//! Configuration loader for YAML files and environment overrides
//!
//! Values are resolved in this order: serde defaults, then the YAML document,
//! then the `NEO_*` environment variables. The result is validated before it
//! is returned.

use crate::config::types::*;
use crate::errors::ConfigError;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Path of the arm's device node; overrides `hardware.device`.
pub const ENV_ARM_DEVICE: &str = "NEO_ARM_DEVICE";
/// `1`/`true`/`yes` forces the simulated arm; `0`/`false`/`no` clears it.
pub const ENV_SIMULATE: &str = "NEO_SIMULATE";
/// Overrides `logging.level`.
pub const ENV_LOG_LEVEL: &str = "NEO_LOG_LEVEL";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<CoreConfig, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<CoreConfig, ConfigError> {
        let mut config: CoreConfig = if content.trim().is_empty() {
            CoreConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };
        Self::apply_environment(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Result<CoreConfig, ConfigError> {
        Self::from_str("")
    }

    fn apply_environment(config: &mut CoreConfig) -> Result<(), ConfigError> {
        if let Ok(device) = env::var(ENV_ARM_DEVICE) {
            if !device.trim().is_empty() {
                config.hardware.device = Some(PathBuf::from(device.trim()));
            }
        }

        if let Ok(value) = env::var(ENV_SIMULATE) {
            config.hardware.simulate = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "{} must be true or false, got '{}'",
                        ENV_SIMULATE, other
                    )))
                }
            };
        }

        if let Ok(level) = env::var(ENV_LOG_LEVEL) {
            if !level.trim().is_empty() {
                config.logging.level = level.trim().to_string();
            }
        }

        Ok(())
    }
}
