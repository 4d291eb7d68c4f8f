//! Faults raised while parsing or running student code.
//!
//! Every message here is read by a beginner, so the wording avoids interpreter
//! jargon and says what went wrong in plain terms.

use std::fmt;

use neo_hardware::HardwareError;
use neo_types::{ErrorKind, ErrorRecord};

/// A problem found before anything ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// What went wrong at runtime, phrased for the student.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultReason {
    DivisionByZero,
    UnknownName(String),
    ArgumentCount {
        name: String,
        expected: String,
        got: usize,
    },
    UnexpectedKeyword {
        name: String,
        keyword: String,
    },
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },
    BadOperand {
        op: String,
        operand: &'static str,
    },
    NotCallable {
        name: String,
        kind: &'static str,
    },
    UnknownCommand(String),
    UnknownMethod {
        kind: &'static str,
        name: String,
    },
    IndexOutOfRange {
        index: i64,
        len: usize,
        container: &'static str,
    },
    NotIterable(&'static str),
    NotIndexable(&'static str),
    RecursionLimit(usize),
    ImportUnavailable,
    TooLarge,
    /// An argument the callee refused, with its own explanation.
    Invalid(String),
    /// The arm facade rejected a call before it reached the controller.
    Rejected(String),
    Internal(String),
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultReason::DivisionByZero => {
                f.write_str("division by zero: a number can't be divided by 0")
            }
            FaultReason::UnknownName(name) => write!(
                f,
                "unknown name '{}': check the spelling, and make sure it was set before this line",
                name
            ),
            FaultReason::ArgumentCount {
                name,
                expected,
                got,
            } => write!(
                f,
                "'{}' expects {} argument(s) but got {}",
                name, expected, got
            ),
            FaultReason::UnexpectedKeyword { name, keyword } => write!(
                f,
                "'{}' doesn't have an option called '{}'",
                name, keyword
            ),
            FaultReason::TypeMismatch { op, left, right } => {
                if left == right {
                    write!(f, "can't use '{}' between two values that are {}", op, plural(left))
                } else {
                    write!(f, "can't use '{}' between {} and {}", op, left, right)
                }
            }
            FaultReason::BadOperand { op, operand } => {
                write!(f, "can't use '{}' on {}", op, operand)
            }
            FaultReason::NotCallable { name, kind } => {
                write!(f, "'{}' is {}, not something you can call", name, kind)
            }
            FaultReason::UnknownCommand(name) => {
                write!(f, "'arm' has no command called '{}'", name)
            }
            FaultReason::UnknownMethod { kind, name } => {
                write!(f, "{} has no method called '{}'", kind, name)
            }
            FaultReason::IndexOutOfRange {
                index,
                len,
                container,
            } => {
                let unit = if *container == "text" { "characters" } else { "items" };
                write!(
                    f,
                    "{} index {} is out of range (the {} has {} {})",
                    container, index, container, len, unit
                )
            }
            FaultReason::NotIterable(kind) => write!(f, "{} can't be looped over", kind),
            FaultReason::NotIndexable(kind) => {
                write!(f, "{} can't be indexed with [ ]", kind)
            }
            FaultReason::RecursionLimit(limit) => {
                write!(f, "too many nested function calls (limit {})", limit)
            }
            FaultReason::ImportUnavailable => f.write_str(
                "import is not available here: everything you need is already provided",
            ),
            FaultReason::TooLarge => f.write_str("that value is too big to work with"),
            FaultReason::Invalid(message)
            | FaultReason::Rejected(message)
            | FaultReason::Internal(message) => f.write_str(message),
        }
    }
}

/// "a number" -> "numbers", "text" -> "text".
fn plural(kind: &str) -> String {
    match kind.strip_prefix("a ") {
        Some(rest) => format!("{}s", rest),
        None => kind.strip_prefix("the ").unwrap_or(kind).to_string(),
    }
}

/// Anything that stops a run early.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    Runtime { reason: FaultReason, line: usize },
    Hardware { error: HardwareError, line: usize },
    Timeout { limit: std::time::Duration, line: usize },
    Cancelled { line: usize },
}

impl Fault {
    pub fn runtime(reason: FaultReason, line: usize) -> Self {
        Fault::Runtime { reason, line }
    }

    pub fn line(&self) -> usize {
        match self {
            Fault::Runtime { line, .. }
            | Fault::Hardware { line, .. }
            | Fault::Timeout { line, .. }
            | Fault::Cancelled { line } => *line,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Fault::Runtime { .. } => ErrorKind::RuntimeFault,
            Fault::Hardware { .. } => ErrorKind::HardwareFault,
            Fault::Timeout { .. } => ErrorKind::Timeout,
            Fault::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    pub fn to_record(&self) -> ErrorRecord {
        match self {
            Fault::Runtime { reason, line } => {
                ErrorRecord::new(ErrorKind::RuntimeFault, reason.to_string(), Some(*line))
            }
            Fault::Hardware { error, line } => {
                ErrorRecord::new(ErrorKind::HardwareFault, error.to_string(), Some(*line))
            }
            Fault::Timeout { limit, line } => ErrorRecord::new(
                ErrorKind::Timeout,
                format!(
                    "the program ran for longer than {} seconds and was stopped",
                    limit.as_secs_f64()
                ),
                Some(*line),
            ),
            Fault::Cancelled { .. } => {
                ErrorRecord::new(ErrorKind::Cancelled, CANCELLED_MESSAGE, None)
            }
        }
    }
}

pub const CANCELLED_MESSAGE: &str = "Execution stopped by user.";

/// Status line written once the arm controller has failed.
pub const HARDWARE_FAILED_WARNING: &str =
    "warning: the arm hardware failed; arm commands are disabled until restart";

impl From<SyntaxError> for ErrorRecord {
    fn from(err: SyntaxError) -> Self {
        ErrorRecord::new(ErrorKind::SyntaxFault, err.message, Some(err.line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_canned_phrasing() {
        assert_eq!(
            FaultReason::DivisionByZero.to_string(),
            "division by zero: a number can't be divided by 0"
        );
        assert_eq!(
            FaultReason::UnknownName("x".into()).to_string(),
            "unknown name 'x': check the spelling, and make sure it was set before this line"
        );
        assert_eq!(
            FaultReason::ArgumentCount {
                name: "set_angle".into(),
                expected: "1".into(),
                got: 2
            }
            .to_string(),
            "'set_angle' expects 1 argument(s) but got 2"
        );
        assert_eq!(
            FaultReason::TypeMismatch {
                op: "+".into(),
                left: "text",
                right: "a number"
            }
            .to_string(),
            "can't use '+' between text and a number"
        );
        assert_eq!(
            FaultReason::IndexOutOfRange {
                index: 5,
                len: 3,
                container: "list"
            }
            .to_string(),
            "list index 5 is out of range (the list has 3 items)"
        );
        assert_eq!(
            FaultReason::UnknownCommand("jump".into()).to_string(),
            "'arm' has no command called 'jump'"
        );
    }

    #[test]
    fn test_same_kind_mismatch_reads_naturally() {
        let reason = FaultReason::TypeMismatch {
            op: "-".into(),
            left: "a list",
            right: "a list",
        };
        assert_eq!(reason.to_string(), "can't use '-' between two values that are lists");
    }

    #[test]
    fn test_records() {
        let record = Fault::runtime(FaultReason::DivisionByZero, 4).to_record();
        assert_eq!(record.kind, ErrorKind::RuntimeFault);
        assert_eq!(record.line, Some(4));

        let timeout = Fault::Timeout {
            limit: Duration::from_secs(30),
            line: 2,
        };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert!(timeout.to_record().message.contains("30 seconds"));

        let cancelled = Fault::Cancelled { line: 7 }.to_record();
        assert_eq!(cancelled.message, CANCELLED_MESSAGE);
        assert_eq!(cancelled.line, None);

        let syntax: ErrorRecord = SyntaxError::new("unexpected ')'", 3).into();
        assert_eq!(syntax.kind, ErrorKind::SyntaxFault);
    }
}
