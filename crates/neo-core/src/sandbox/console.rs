//! Captured `print` output.

use std::sync::Arc;

use neo_types::OutputSink;

/// Largest amount of output kept for the final result. Streaming to the sink
/// is not affected.
const MAX_CAPTURED: usize = 1 << 20;

/// Longest unfinished line held back before it is streamed as it stands.
const MAX_PENDING: usize = 4096;

/// Collects what the program prints and streams it to the sink one line at a
/// time.
pub struct Console {
    sink: Arc<dyn OutputSink>,
    captured: String,
    pending: String,
    truncated: bool,
}

impl Console {
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            sink,
            captured: String::new(),
            pending: String::new(),
            truncated: false,
        }
    }

    pub fn write(&mut self, text: &str) {
        if self.captured.len() + text.len() <= MAX_CAPTURED {
            self.captured.push_str(text);
        } else if !self.truncated {
            self.truncated = true;
            log::debug!("Captured output exceeded {} bytes; truncating", MAX_CAPTURED);
        }

        let mut rest = text;
        while let Some(end) = rest.find('\n') {
            self.pending.push_str(&rest[..end]);
            let line = std::mem::take(&mut self.pending);
            self.sink.stdout(&line);
            rest = &rest[end + 1..];
        }
        self.pending.push_str(rest);
        if self.pending.len() >= MAX_PENDING {
            self.flush();
        }
    }

    /// Streams a status line after any partial output.
    pub fn status(&mut self, text: &str) {
        self.flush();
        self.sink.status(text);
    }

    /// Emits a partial line, so status text written next lands after it.
    pub fn flush(&mut self) {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.sink.stdout(&line);
        }
    }

    /// Everything printed, without the final newline.
    pub fn finish(mut self) -> String {
        self.flush();
        let mut output = std::mem::take(&mut self.captured);
        if output.ends_with('\n') {
            output.pop();
        }
        if self.truncated {
            output.push_str("\n[output truncated]");
        }
        output
    }
}
