//! The restricted language student programs are written in.
//!
//! Source text goes through [`lexer`] and [`parser`] into the tree in [`ast`],
//! and [`interpreter`] walks that tree against a [`Namespace`] built by
//! [`NamespaceBuilder`].

pub mod ast;
pub mod builtins;
pub mod console;
pub mod faults;
pub mod interpreter;
pub mod lexer;
pub mod namespace;
pub mod ops;
pub mod parser;
pub mod value;

pub use console::Console;
pub use faults::{Fault, FaultReason, SyntaxError, CANCELLED_MESSAGE, HARDWARE_FAILED_WARNING};
pub use interpreter::{Interpreter, RunControl, ARM_COMMANDS};
pub use namespace::{Namespace, NamespaceBuilder};
pub use parser::parse;
pub use value::Value;
