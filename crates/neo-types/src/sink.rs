//! Destination for output produced while code runs.

use std::sync::{Mutex, PoisonError};

use crate::events::{OutputEvent, OutputKind};

/// Receives output lines in production order.
///
/// Both the sandbox (`print`) and the arm controllers (status text) write
/// through this trait; implementations must preserve call order.
pub trait OutputSink: Send + Sync {
    fn emit(&self, event: OutputEvent);

    fn stdout(&self, text: &str) {
        self.emit(OutputEvent::stdout(text));
    }

    fn status(&self, text: &str) {
        self.emit(OutputEvent::status(text));
    }

    fn error(&self, text: &str, line: Option<usize>) {
        self.emit(OutputEvent::error(text, line));
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&self, _event: OutputEvent) {}
}

/// Keeps every event in memory, mostly useful for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<OutputEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of all events recorded so far.
    pub fn events(&self) -> Vec<OutputEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The texts of all events of `kind`, in order.
    pub fn lines(&self, kind: OutputKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.text)
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl OutputSink for MemorySink {
    fn emit(&self, event: OutputEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
