//! Event types streamed from the execution core to the UI collaborator.
//!
//! A run produces zero or more [`OutputEvent`]s followed by exactly one
//! [`ResultEvent`], all delivered over one ordered channel as [`CoreEvent`]s.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ErrorRecord;
use crate::types::{ExecutionResult, RunId};

/// Which console channel an output line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Text printed by the student's program.
    Stdout,
    /// Progress and hardware status lines.
    Status,
    /// Fault descriptions.
    Error,
}

/// One line of output produced while a run is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    /// The console channel.
    pub kind: OutputKind,
    /// The text, without a trailing newline.
    pub text: String,
    /// Source line the output relates to (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl OutputEvent {
    pub fn new(kind: OutputKind, text: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn stdout(text: impl Into<String>) -> Self {
        Self::new(OutputKind::Stdout, text, None)
    }

    pub fn status(text: impl Into<String>) -> Self {
        Self::new(OutputKind::Status, text, None)
    }

    pub fn error(text: impl Into<String>, line: Option<usize>) -> Self {
        Self::new(OutputKind::Error, text, line)
    }
}

/// The terminating event of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEvent {
    /// The run this result belongs to.
    #[serde(rename = "runId")]
    pub run_id: RunId,
    /// `true` when the run finished without a fault.
    pub success: bool,
    /// Wall-clock time spent executing.
    pub duration: Duration,
    /// The fault that ended the run (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

impl ResultEvent {
    /// Builds the result event for `run_id` from an execution result.
    pub fn from_result(run_id: RunId, result: &ExecutionResult) -> Self {
        Self {
            run_id,
            success: result.success,
            duration: result.duration,
            error: result.error.clone(),
        }
    }
}

/// Everything the core sends to the UI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoreEvent {
    /// An output line.
    Output(OutputEvent),
    /// The end of a run.
    Result(ResultEvent),
}

impl CoreEvent {
    /// Returns the output payload, if this is an output event.
    pub fn as_output(&self) -> Option<&OutputEvent> {
        match self {
            CoreEvent::Output(event) => Some(event),
            CoreEvent::Result(_) => None,
        }
    }

    /// Returns the result payload, if this is a result event.
    pub fn as_result(&self) -> Option<&ResultEvent> {
        match self {
            CoreEvent::Result(event) => Some(event),
            CoreEvent::Output(_) => None,
        }
    }
}
