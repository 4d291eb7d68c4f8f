//! Fault taxonomy reported to students.
//!
//! These are data, not Rust errors: every fault raised while running student
//! code ends up as an [`ErrorRecord`] inside an execution result.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The code could not be parsed.
    SyntaxFault,
    /// The code failed while running, or an arm call was rejected.
    RuntimeFault,
    /// The arm controller failed to carry out a command.
    HardwareFault,
    /// The run or a single hardware command took too long.
    Timeout,
    /// The run was stopped on request.
    Cancelled,
}

impl ErrorKind {
    /// Whether this fault also warrants a status-level warning.
    pub fn warns(&self) -> bool {
        matches!(self, ErrorKind::HardwareFault | ErrorKind::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SyntaxFault => "SyntaxFault",
            ErrorKind::RuntimeFault => "RuntimeFault",
            ErrorKind::HardwareFault => "HardwareFault",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// A student-readable description of what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// The fault category.
    pub kind: ErrorKind,
    /// Plain-language explanation, free of host-internal detail.
    pub message: String,
    /// 1-based source line, when the fault can be tied to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }
}

/// Renders the record the way the console shows it, e.g.
/// `Error (line 3): division by zero: a number can't be divided by 0`.
impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            ErrorKind::SyntaxFault => "Syntax Error",
            ErrorKind::HardwareFault => "Hardware Error",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Cancelled => "Stopped",
            ErrorKind::RuntimeFault => "Error",
        };
        match self.line {
            Some(line) => write!(f, "{} (line {}): {}", label, line, self.message),
            None => write!(f, "{}: {}", label, self.message),
        }
    }
}
