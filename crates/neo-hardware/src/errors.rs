//! Error types for the hardware layer
//!
//! Two audiences read these errors. [`FacadeError::InvalidArgument`] carries
//! text written for the student and becomes a runtime fault in the console.
//! [`HardwareError`] describes a controller or transport failure and becomes a
//! hardware fault; the controller link uses [`HardwareError::is_fatal`] to decide
//! whether the real controller must be abandoned.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("device connection closed")]
    Closed,
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    #[error("the arm did not answer the connection handshake: {0}")]
    Handshake(String),
    #[error("the arm did not acknowledge '{command}' within {timeout:?}")]
    AckTimeout { command: String, timeout: Duration },
    #[error("the arm refused '{command}': {reason}")]
    Device { command: String, reason: String },
    #[error("lost the connection to the arm: {0}")]
    Io(String),
    #[error("the arm stopped responding earlier in this session; restart to reconnect")]
    ControllerFailed,
    #[error("the arm controller has been shut down")]
    ShutDown,
}

impl HardwareError {
    /// Every transport-level failure ends the real controller's session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HardwareError::AckTimeout { .. }
                | HardwareError::Device { .. }
                | HardwareError::Io(_)
                | HardwareError::Handshake(_)
        )
    }

    pub(crate) fn from_transport(command: &str, err: TransportError) -> Self {
        match err {
            TransportError::Timeout(timeout) => HardwareError::AckTimeout {
                command: command.to_string(),
                timeout,
            },
            TransportError::Closed => HardwareError::Io("device connection closed".to_string()),
            TransportError::Io(e) => HardwareError::Io(e.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FacadeError {
    /// The call was rejected before reaching the controller.
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Hardware(#[from] HardwareError),
}
