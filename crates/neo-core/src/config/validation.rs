//! Sanity checks applied to every loaded configuration

use std::collections::HashSet;

use neo_hardware::Joint;

use crate::config::types::{CoreConfig, SandboxConfig};
use crate::errors::ConfigError;
use crate::sandbox::builtins::Builtin;
use crate::sandbox::lexer::Keyword;

/// Highest pin number a board can address.
pub const MAX_PIN: u8 = 63;

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.execution.run_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "execution.run_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.hardware.handshake_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "hardware.handshake_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.hardware.command_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "hardware.command_timeout_ms must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for joint in Joint::ALL {
            let pin = self.hardware.pins.pin(joint);
            if pin > MAX_PIN {
                return Err(ConfigError::Invalid(format!(
                    "pin {} for {} is above the highest board pin ({})",
                    pin, joint, MAX_PIN
                )));
            }
            if !seen.insert(pin) {
                return Err(ConfigError::Invalid(format!(
                    "pin {} is assigned to more than one servo",
                    pin
                )));
            }
        }

        self.sandbox.validate()?;

        if self.logging.level_filter().is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }
}

impl SandboxConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recursion_limit == 0 {
            return Err(ConfigError::Invalid(
                "sandbox.recursion_limit must be greater than 0".to_string(),
            ));
        }

        if self.max_collection_size == 0 {
            return Err(ConfigError::Invalid(
                "sandbox.max_collection_size must be greater than 0".to_string(),
            ));
        }

        let name = self.arm_binding.as_str();
        let mut chars = name.chars();
        let is_identifier = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !is_identifier {
            return Err(ConfigError::Invalid(format!(
                "sandbox.arm_binding '{}' is not a valid name",
                name
            )));
        }
        if Keyword::from_word(name).is_some() || Builtin::ALL.iter().any(|b| b.name() == name) {
            return Err(ConfigError::Invalid(format!(
                "sandbox.arm_binding '{}' is already taken by the language",
                name
            )));
        }

        Ok(())
    }
}
