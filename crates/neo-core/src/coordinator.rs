//! Schedules runs on a worker thread and streams their events back.
//!
//! The UI thread calls into [`Coordinator`] and never executes code itself.
//! Each accepted submission gets its own named worker thread; a busy flag
//! keeps at most one run in flight, and a submission while busy is refused
//! rather than queued.
//!
//! Everything a run produces, printed text, arm status lines, errors and the
//! final result, travels over one unbounded channel in production order. A
//! run lock held by each worker until its result is sent keeps the events of
//! consecutive runs from interleaving.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use neo_hardware::{ArmState, Connector, ControllerLink, HardwareFacade, LinkState};
use neo_types::{
    CoreEvent, ErrorKind, ErrorRecord, ExecutionMode, ExecutionRequest, ExecutionResult,
    HistoryEntry, OutputEvent, OutputSink, ResultEvent, RunId,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::CoreConfig;
use crate::errors::SubmitError;
use crate::executor::Executor;
use crate::repl::{History, ReplSession};
use crate::sandbox::RunControl;

const WORKER_NAME: &str = "neo-run-worker";
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Output sink that forwards every event to the UI channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<CoreEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<CoreEvent>) -> Self {
        Self { tx }
    }
}

impl OutputSink for ChannelSink {
    fn emit(&self, event: OutputEvent) {
        // A closed channel means the UI has gone away; the run still finishes.
        let _ = self.tx.send(CoreEvent::Output(event));
    }
}

struct ActiveRun {
    run_id: RunId,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

/// State shared between the coordinator and its workers.
struct Shared {
    busy: AtomicBool,
    run_lock: Mutex<()>,
    executor: Executor,
    repl: Mutex<Option<ReplSession>>,
    /// Mirrors `repl.is_some()` so it can be read while a line is running.
    repl_active: AtomicBool,
    history: History,
    arm_snapshot: watch::Sender<ArmState>,
    run_timeout: Duration,
}

impl Shared {
    fn run(&self, request: &ExecutionRequest, cancel: &CancellationToken) -> ExecutionResult {
        // Selecting a controller may wait for a handshake; the run's clock
        // starts only after that.
        locked(self.executor.arm()).connect();

        let control = RunControl::new(cancel.clone(), self.run_timeout);
        let result = match request.mode {
            ExecutionMode::Script => {
                let mut namespace = self.executor.new_namespace();
                self.executor
                    .execute_with(&request.code, &mut namespace, ExecutionMode::Script, &control)
            }
            ExecutionMode::ReplLine => {
                let mut repl = locked(&self.repl);
                let session = repl.get_or_insert_with(|| self.new_session());
                session.execute_line_with(&request.code, &control)
            }
        };

        self.arm_snapshot
            .send_replace(locked(self.executor.arm()).arm_state());
        result
    }

    fn new_session(&self) -> ReplSession {
        self.repl_active.store(true, Ordering::SeqCst);
        ReplSession::with_history(self.executor.clone(), self.run_timeout, self.history.clone())
    }
}

pub struct Coordinator {
    shared: Arc<Shared>,
    events: mpsc::UnboundedSender<CoreEvent>,
    sink: Arc<dyn OutputSink>,
    link_state: watch::Receiver<LinkState>,
    arm_state: watch::Receiver<ArmState>,
    active: Mutex<Option<ActiveRun>>,
    shut_down: AtomicBool,
}

impl Coordinator {
    /// A coordinator whose arm connection follows `config.hardware`. Returns
    /// the receiving end of the event stream.
    pub fn new(config: CoreConfig) -> (Self, mpsc::UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: Arc<dyn OutputSink> = Arc::new(ChannelSink::new(tx.clone()));
        let link = ControllerLink::new(config.hardware.clone(), sink.clone());
        (Self::assemble(config, link, tx, sink), rx)
    }

    /// Like [`Coordinator::new`] with an explicit connector; `None` means the
    /// simulated arm only.
    pub fn with_connector(
        config: CoreConfig,
        connector: Option<Box<dyn Connector>>,
    ) -> (Self, mpsc::UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: Arc<dyn OutputSink> = Arc::new(ChannelSink::new(tx.clone()));
        let link = ControllerLink::with_connector(config.hardware.clone(), connector, sink.clone());
        (Self::assemble(config, link, tx, sink), rx)
    }

    fn assemble(
        config: CoreConfig,
        mut link: ControllerLink,
        events: mpsc::UnboundedSender<CoreEvent>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        let (state_tx, link_state) = watch::channel(link.state());
        link.on_state_change(Box::new(move |state| {
            state_tx.send_replace(state);
        }));
        let (arm_snapshot, arm_state) = watch::channel(link.arm_state());

        let facade = Arc::new(Mutex::new(HardwareFacade::new(link, sink.clone())));
        let executor = Executor::new(config.sandbox.clone(), sink.clone(), facade);

        let shared = Arc::new(Shared {
            busy: AtomicBool::new(false),
            run_lock: Mutex::new(()),
            executor,
            repl: Mutex::new(None),
            repl_active: AtomicBool::new(false),
            history: History::new(),
            arm_snapshot,
            run_timeout: config.execution.run_timeout(),
        });

        Self {
            shared,
            events,
            sink,
            link_state,
            arm_state,
            active: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Starts a run on a new worker thread.
    ///
    /// Refused while another run is in flight, for scripts while a REPL
    /// session is active, and after [`Coordinator::shutdown`].
    pub fn submit(&self, request: ExecutionRequest) -> Result<RunId, SubmitError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(SubmitError::ShutDown);
        }
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Rejected submission: a run is already active");
            return Err(SubmitError::Busy);
        }

        {
            let mut repl = locked(&self.shared.repl);
            match request.mode {
                ExecutionMode::Script if repl.is_some() => {
                    self.shared.busy.store(false, Ordering::SeqCst);
                    return Err(SubmitError::ReplActive);
                }
                ExecutionMode::ReplLine if repl.is_none() => {
                    log::info!("Starting a REPL session");
                    *repl = Some(self.shared.new_session());
                }
                _ => {}
            }
        }

        let run_id = RunId::new();
        let cancel = CancellationToken::new();
        let shared = self.shared.clone();
        let events = self.events.clone();
        let sink = self.sink.clone();
        let token = cancel.clone();

        let spawned = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || work(shared, request, run_id, token, events, sink));

        match spawned {
            Ok(worker) => {
                log::info!("Run {} accepted", run_id);
                *locked(&self.active) = Some(ActiveRun {
                    run_id,
                    cancel,
                    worker,
                });
                Ok(run_id)
            }
            Err(e) => {
                log::error!("Failed to spawn execution worker: {}", e);
                self.shared.busy.store(false, Ordering::SeqCst);
                Err(SubmitError::Spawn(e.to_string()))
            }
        }
    }

    /// Asks the active run to stop at its next checkpoint. A hardware command
    /// already waiting for its acknowledgement is allowed to finish first.
    pub fn stop(&self) {
        if !self.is_busy() {
            return;
        }
        if let Some(active) = locked(&self.active).as_ref() {
            log::info!("Stop requested for run {}", active.run_id);
            active.cancel.cancel();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::SeqCst)
    }

    pub fn is_repl_active(&self) -> bool {
        self.shared.repl_active.load(Ordering::SeqCst)
    }

    /// Opens a REPL session if none is active.
    pub fn start_repl(&self) -> Result<(), SubmitError> {
        self.ensure_idle()?;
        let mut repl = locked(&self.shared.repl);
        if repl.is_none() {
            log::info!("Starting a REPL session");
            *repl = Some(self.shared.new_session());
        }
        Ok(())
    }

    /// Closes the REPL session, discarding its namespace and history.
    pub fn end_repl(&self) -> Result<(), SubmitError> {
        self.ensure_idle()?;
        if locked(&self.shared.repl).take().is_some() {
            log::info!("REPL session ended");
        }
        self.shared.repl_active.store(false, Ordering::SeqCst);
        self.shared.history.clear();
        Ok(())
    }

    /// Clears the REPL namespace and history.
    pub fn reset_repl(&self) -> Result<(), SubmitError> {
        self.ensure_idle()?;
        match locked(&self.shared.repl).as_mut() {
            Some(session) => session.reset(),
            None => self.shared.history.clear(),
        }
        Ok(())
    }

    /// The last `n` REPL commands, most recent first. Never waits for a run.
    pub fn history(&self, n: usize) -> Vec<HistoryEntry> {
        self.shared.history.recent(n)
    }

    pub fn controller_state(&self) -> LinkState {
        *self.link_state.borrow()
    }

    /// A watch on controller state changes, for UIs that want to react to them.
    pub fn subscribe_controller_state(&self) -> watch::Receiver<LinkState> {
        self.link_state.clone()
    }

    /// The arm's current state, or the state at the end of the last run if a
    /// run is using the arm right now.
    pub fn arm_state(&self) -> ArmState {
        match self.shared.executor.arm().try_lock() {
            Ok(facade) => facade.arm_state(),
            Err(_) => *self.arm_state.borrow(),
        }
    }

    /// Cancels any active run, waits for its worker and releases the arm.
    /// Calling it again does nothing.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("Shutting down execution core");
        if let Some(active) = locked(&self.active).take() {
            active.cancel.cancel();
            if active.worker.join().is_err() {
                log::warn!("Worker for run {} ended abnormally", active.run_id);
            }
        }
        locked(self.shared.executor.arm()).shutdown();
    }

    fn ensure_idle(&self) -> Result<(), SubmitError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(SubmitError::ShutDown);
        }
        if self.is_busy() {
            return Err(SubmitError::Busy);
        }
        Ok(())
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Body of a worker thread: one run, one result event.
fn work(
    shared: Arc<Shared>,
    request: ExecutionRequest,
    run_id: RunId,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<CoreEvent>,
    sink: Arc<dyn OutputSink>,
) {
    let _turn = locked(&shared.run_lock);
    let started = Instant::now();
    log::debug!("Run {} executing {:?} ({} bytes)", run_id, request.mode, request.code.len());

    let result = panic::catch_unwind(AssertUnwindSafe(|| shared.run(&request, &cancel)))
        .unwrap_or_else(|payload| {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Run {} panicked: {}", run_id, detail);
            let record = ErrorRecord::new(
                ErrorKind::RuntimeFault,
                "something went wrong inside the robot software; please try again",
                None,
            );
            sink.error(&record.to_string(), None);
            ExecutionResult::failed(String::new(), record, started.elapsed())
        });

    log::info!(
        "Run {} finished: success={} in {:?}",
        run_id,
        result.success,
        result.duration
    );

    // Cleared before the result is sent, so a UI reacting to the result can
    // submit again straight away.
    shared.busy.store(false, Ordering::SeqCst);
    let _ = events.send(CoreEvent::Result(ResultEvent::from_result(run_id, &result)));
}
