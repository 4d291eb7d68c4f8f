//! Error types for the execution core
//!
//! These are the failures a caller of the core sees as Rust errors. Problems
//! in student code are not errors at this level: they come back as data in an
//! [`neo_types::ErrorRecord`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },
    #[error("Failed to parse YAML config: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Why a submission was refused. No worker is started in any of these cases.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a program is already running; stop it or wait for it to finish")]
    Busy,
    #[error("a REPL session is active; end it before running a script")]
    ReplActive,
    #[error("the execution core has been shut down")]
    ShutDown,
    #[error("could not start the execution worker: {0}")]
    Spawn(String),
}
