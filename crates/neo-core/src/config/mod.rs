//! Configuration module for the execution core
//!
//! A [`CoreConfig`] is loaded once at startup from YAML and passed by value
//! into the coordinator, which hands each part to the component that needs
//! it. Nothing reads configuration from global state afterwards.

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::*;
pub use types::*;
pub use validation::*;

#[cfg(test)]
mod tests;

use crate::errors::ConfigError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<CoreConfig, ConfigError> {
    ConfigLoader::from_file(path).await
}
