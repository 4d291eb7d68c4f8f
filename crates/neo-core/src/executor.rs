//! Runs source text against a namespace and reports what happened.
//!
//! The executor never fails in the Rust sense: every problem in student code,
//! from a stray bracket to a lost arm connection, comes back as an
//! [`ExecutionResult`] carrying an [`ErrorRecord`], and is also written to the
//! output sink as a line-numbered error event.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use neo_hardware::HardwareFacade;
use neo_types::{ErrorKind, ErrorRecord, ExecutionMode, ExecutionResult, OutputSink};
use tokio_util::sync::CancellationToken;

use crate::config::SandboxConfig;
use crate::sandbox::{
    parse, Console, Interpreter, Namespace, NamespaceBuilder, RunControl, HARDWARE_FAILED_WARNING,
};

#[derive(Clone)]
pub struct Executor {
    config: SandboxConfig,
    sink: Arc<dyn OutputSink>,
    arm: Arc<Mutex<HardwareFacade>>,
}

impl Executor {
    pub fn new(
        config: SandboxConfig,
        sink: Arc<dyn OutputSink>,
        arm: Arc<Mutex<HardwareFacade>>,
    ) -> Self {
        Self { config, sink, arm }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn arm(&self) -> &Arc<Mutex<HardwareFacade>> {
        &self.arm
    }

    /// A fresh namespace holding only the allow-listed bindings.
    pub fn new_namespace(&self) -> Namespace {
        NamespaceBuilder::new(&self.config).build()
    }

    /// Runs `code` as a script with its own deadline and no way to cancel it
    /// other than the timeout.
    pub fn execute(&self, code: &str, namespace: &mut Namespace, timeout: Duration) -> ExecutionResult {
        let control = RunControl::new(CancellationToken::new(), timeout);
        self.execute_with(code, namespace, ExecutionMode::Script, &control)
    }

    pub fn execute_with(
        &self,
        code: &str,
        namespace: &mut Namespace,
        mode: ExecutionMode,
        control: &RunControl,
    ) -> ExecutionResult {
        let started = Instant::now();

        let program = match parse(code) {
            Ok(program) => program,
            Err(err) => {
                log::debug!("Syntax fault: {}", err);
                let record = ErrorRecord::from(err);
                self.report_error(&record, control);
                return ExecutionResult::failed(String::new(), record, started.elapsed());
            }
        };

        let mut console = Console::new(self.sink.clone());
        let outcome = Interpreter::new(namespace, &mut console, &self.arm, control, &self.config)
            .echo_expressions(mode == ExecutionMode::ReplLine)
            .run(&program);
        let output = console.finish();
        let duration = started.elapsed();

        match outcome {
            Ok(()) => {
                log::debug!("Run finished in {:?}", duration);
                ExecutionResult::succeeded(output, duration)
            }
            Err(fault) => {
                let record = fault.to_record();
                match record.kind {
                    ErrorKind::HardwareFault => log::error!("Hardware fault: {}", record),
                    _ => log::debug!("Run ended with {:?}: {}", record.kind, record),
                }
                self.report_error(&record, control);
                ExecutionResult::failed(output, record, duration)
            }
        }
    }

    /// Writes console text that did not come from running code, such as the
    /// output of a meta command.
    pub fn report(&self, text: &str) {
        for line in text.lines() {
            self.sink.stdout(line);
        }
    }

    fn report_error(&self, record: &ErrorRecord, control: &RunControl) {
        if record.kind == ErrorKind::Cancelled {
            self.sink.error(&record.message, None);
            return;
        }
        self.sink.error(&record.to_string(), record.line);
        match record.kind {
            ErrorKind::HardwareFault => self.sink.status(HARDWARE_FAILED_WARNING),
            ErrorKind::Timeout => self.sink.status(&format!(
                "warning: time limit of {} seconds reached",
                control.limit().as_secs_f64()
            )),
            _ => {}
        }
    }
}
