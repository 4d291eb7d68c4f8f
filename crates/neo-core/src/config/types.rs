//! Configuration types for the execution core
//!
//! Every section has serde defaults, so an empty file or a file naming only
//! the values that differ is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use neo_hardware::{HardwareConfig, ServoPins};

/// Root configuration for one core instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub hardware: HardwareConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// Defaults, with the arm simulated.
    pub fn simulated() -> Self {
        Self {
            hardware: HardwareConfig::simulated(),
            ..Self::default()
        }
    }
}

/// What student code is allowed to see and how far it may go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Name under which the arm facade is bound.
    #[serde(default = "default_arm_binding")]
    pub arm_binding: String,
    /// Deepest chain of nested student function calls.
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
    /// Most items a list, or bytes a text value, may hold.
    #[serde(default = "default_max_collection_size")]
    pub max_collection_size: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            arm_binding: default_arm_binding(),
            recursion_limit: default_recursion_limit(),
            max_collection_size: default_max_collection_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Wall-clock limit for one run, in seconds.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl ExecutionConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_colored")]
    pub colored: bool,
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Option<log::LevelFilter> {
        self.level.parse().ok()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            colored: default_colored(),
        }
    }
}

fn default_arm_binding() -> String { "arm".to_string() }
fn default_recursion_limit() -> usize { 64 }
fn default_max_collection_size() -> usize { 100_000 }
fn default_run_timeout_secs() -> u64 { 30 }
fn default_log_level() -> String { "info".to_string() }
fn default_colored() -> bool { true }
