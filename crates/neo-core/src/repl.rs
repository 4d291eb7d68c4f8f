//! Line-by-line console over one persistent namespace.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use neo_types::{ExecutionMode, ExecutionResult, HistoryEntry};
use tokio_util::sync::CancellationToken;

use crate::executor::Executor;
use crate::sandbox::{Namespace, RunControl, ARM_COMMANDS};

/// Commands typed into a session, oldest first.
///
/// Cloning shares the same list, so a reader can look at the history while
/// the session that owns it is busy running code.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, command: &str) {
        self.entries().push(HistoryEntry::now(command));
    }

    /// The last `n` entries, most recent first.
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        self.entries().iter().rev().take(n).cloned().collect()
    }

    pub fn all(&self) -> Vec<HistoryEntry> {
        self.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}

pub struct ReplSession {
    executor: Executor,
    namespace: Namespace,
    history: History,
    timeout: Duration,
}

impl ReplSession {
    pub fn new(executor: Executor, timeout: Duration) -> Self {
        Self::with_history(executor, timeout, History::new())
    }

    /// A session that records into an existing, possibly shared, history.
    pub fn with_history(executor: Executor, timeout: Duration, history: History) -> Self {
        let namespace = executor.new_namespace();
        Self {
            executor,
            namespace,
            history,
            timeout,
        }
    }

    pub fn history_handle(&self) -> &History {
        &self.history
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn execute_line(&mut self, line: &str) -> ExecutionResult {
        let control = RunControl::new(CancellationToken::new(), self.timeout);
        self.execute_line_with(line, &control)
    }

    /// Records `line` and runs it. Blank lines are neither recorded nor run.
    pub fn execute_line_with(&mut self, line: &str, control: &RunControl) -> ExecutionResult {
        let started = Instant::now();
        if line.trim().is_empty() {
            return ExecutionResult::succeeded(String::new(), started.elapsed());
        }

        self.history.push(line);
        match line.trim() {
            "help" => {
                let text = self.help_text();
                self.executor.report(&text);
                ExecutionResult::succeeded(text, started.elapsed())
            }
            "history" => {
                let text = self
                    .history
                    .all()
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| format!("{:>3}  {}", i + 1, entry.command))
                    .collect::<Vec<_>>()
                    .join("\n");
                self.executor.report(&text);
                ExecutionResult::succeeded(text, started.elapsed())
            }
            _ => self.executor.execute_with(
                line,
                &mut self.namespace,
                ExecutionMode::ReplLine,
                control,
            ),
        }
    }

    /// Forgets every definition and the whole history.
    pub fn reset(&mut self) {
        let mut entries = self.history.entries();
        entries.clear();
        self.namespace = self.executor.new_namespace();
        log::debug!("REPL session reset");
    }

    /// The last `n` commands, most recent first.
    pub fn history(&self, n: usize) -> Vec<HistoryEntry> {
        self.history.recent(n)
    }

    fn help_text(&self) -> String {
        let arm = &self.executor.config().arm_binding;
        let mut lines = vec!["Arm commands:".to_string()];
        for command in ARM_COMMANDS {
            let args = match *command {
                "set_angle" => "angle",
                "turn_left" | "turn_right" | "elbow_left" | "elbow_right" => "angle=90",
                "delay" => "seconds",
                _ => "",
            };
            lines.push(format!("  {}.{}({})", arm, command, args));
        }
        lines.push("Functions:".to_string());
        lines.push(
            "  print, delay, range, len, abs, min, max, round, sum, sorted, reversed,".to_string(),
        );
        lines.push("  enumerate, zip, int, float, str, bool, list".to_string());
        lines.push("Console:".to_string());
        lines.push("  help     show this list".to_string());
        lines.push("  history  show the commands typed so far".to_string());
        lines.join("\n")
    }
}
