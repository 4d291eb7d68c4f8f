//! Sandboxed execution engine for beginner robot-arm programs.
//!
//! Student code is parsed and evaluated by a purpose-built interpreter whose
//! only view of the outside world is an allow-listed namespace: a few builtins,
//! `print`, `delay`, and the arm facade. Runs are scheduled by the
//! [`Coordinator`] on a worker thread; everything they produce comes back to
//! the UI as an ordered stream of [`neo_types::CoreEvent`]s.
//!
//! # Layout
//!
//! - [`sandbox`]: lexer, parser, values and evaluator of the student language
//! - [`executor`]: runs one piece of code and turns faults into results
//! - [`repl`]: persistent namespace and history for line-by-line use
//! - [`coordinator`]: worker threads, busy flag, cancellation, event channel
//! - [`config`] and [`logging`]: YAML configuration and logger setup

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod executor;
pub mod logging;
pub mod repl;
pub mod sandbox;

pub use config::*;
pub use coordinator::{ChannelSink, Coordinator};
pub use errors::{ConfigError, SubmitError};
pub use executor::Executor;
pub use repl::{History, ReplSession};
pub use sandbox::{Namespace, NamespaceBuilder, RunControl};
