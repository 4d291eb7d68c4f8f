//! Request, result and history types exchanged with the execution core.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorRecord;

/// Identifier handed back by `submit` and echoed in the matching result event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Creates a fresh random run identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a submitted piece of code should be run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// A whole program, run against a fresh namespace.
    Script,
    /// One interactive line, run against the persistent REPL namespace.
    ReplLine,
}

/// A unit of work submitted by the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The student's source text.
    pub code: String,
    /// Whether the code is a script or a REPL line.
    pub mode: ExecutionMode,
}

impl ExecutionRequest {
    /// Creates a script-mode request.
    pub fn script(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            mode: ExecutionMode::Script,
        }
    }

    /// Creates a REPL-line request.
    pub fn repl_line(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            mode: ExecutionMode::ReplLine,
        }
    }
}

/// Outcome of running one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Everything the program printed, in order.
    pub output: String,
    /// The fault that ended the run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    /// `true` when the run finished without a fault.
    pub success: bool,
    /// Wall-clock time spent executing.
    pub duration: Duration,
}

impl ExecutionResult {
    /// A successful result carrying the captured output.
    pub fn succeeded(output: String, duration: Duration) -> Self {
        Self {
            output,
            error: None,
            success: true,
            duration,
        }
    }

    /// A failed result carrying the captured output and the fault.
    pub fn failed(output: String, error: ErrorRecord, duration: Duration) -> Self {
        Self {
            output,
            error: Some(error),
            success: false,
            duration,
        }
    }
}

/// One command typed into the REPL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The command text as submitted.
    pub command: String,
    /// When the command was recorded.
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Records `command` with the current time.
    pub fn now(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timestamp: Utc::now(),
        }
    }
}
