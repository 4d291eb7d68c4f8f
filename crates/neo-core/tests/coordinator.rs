use std::sync::{Arc, Mutex};
use std::time::Duration;

use neo_core::{Coordinator, CoreConfig, SubmitError};
use neo_hardware::{ArmState, Connector, HardwareConfig, LinkState, Transport, TransportError};
use neo_types::{CoreEvent, ErrorKind, ExecutionRequest, OutputEvent, OutputKind, ResultEvent};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(30);

/// Collects events up to and including the next result.
async fn next_result(rx: &mut UnboundedReceiver<CoreEvent>) -> (Vec<OutputEvent>, ResultEvent) {
    let mut outputs = Vec::new();
    loop {
        let event = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event channel closed");
        match event {
            CoreEvent::Output(output) => outputs.push(output),
            CoreEvent::Result(result) => return (outputs, result),
        }
    }
}

async fn next_output(rx: &mut UnboundedReceiver<CoreEvent>) -> OutputEvent {
    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    event.as_output().cloned().expect("expected an output event")
}

fn texts(outputs: &[OutputEvent], kind: OutputKind) -> Vec<String> {
    outputs
        .iter()
        .filter(|o| o.kind == kind)
        .map(|o| o.text.clone())
        .collect()
}

fn simulated() -> (Coordinator, UnboundedReceiver<CoreEvent>) {
    Coordinator::with_connector(CoreConfig::simulated(), None)
}

struct SilentBoard;

impl Transport for SilentBoard {
    fn send_line(&mut self, _line: &str) -> Result<(), TransportError> {
        Ok(())
    }

    fn recv_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        Err(TransportError::Timeout(timeout))
    }

    fn describe(&self) -> String {
        "silent-board".to_string()
    }
}

struct SilentConnector;

impl Connector for SilentConnector {
    fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(SilentBoard))
    }

    fn describe(&self) -> String {
        "silent-board".to_string()
    }
}

/// Answers the handshake, then acknowledges `budget` commands and goes quiet.
/// A quiet board leaves every read waiting out its full timeout.
struct TiringBoard {
    last: String,
    budget: Arc<Mutex<usize>>,
}

impl Transport for TiringBoard {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.last = line.to_string();
        Ok(())
    }

    fn recv_line(&mut self, timeout: Duration) -> Result<String, TransportError> {
        if self.last.starts_with("HELLO") {
            return Ok("READY".to_string());
        }
        let mut budget = self.budget.lock().unwrap();
        if *budget == 0 {
            std::thread::sleep(timeout);
            return Err(TransportError::Timeout(timeout));
        }
        *budget -= 1;
        Ok("OK".to_string())
    }

    fn describe(&self) -> String {
        "tiring-board".to_string()
    }
}

struct TiringConnector(usize);

impl Connector for TiringConnector {
    fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(TiringBoard {
            last: String::new(),
            budget: Arc::new(Mutex::new(self.0)),
        }))
    }

    fn describe(&self) -> String {
        "tiring-board".to_string()
    }
}

fn hardware_config() -> CoreConfig {
    CoreConfig {
        hardware: HardwareConfig {
            handshake_timeout_ms: 10,
            command_timeout_ms: 20,
            ..HardwareConfig::default()
        },
        ..CoreConfig::default()
    }
}

#[tokio::test]
async fn test_empty_script_succeeds_silently() {
    let (core, mut rx) = simulated();
    let run_id = core.submit(ExecutionRequest::script("")).unwrap();
    let (outputs, result) = next_result(&mut rx).await;

    assert_eq!(result.run_id, run_id);
    assert!(result.success);
    assert!(result.error.is_none());
    assert!(texts(&outputs, OutputKind::Stdout).is_empty());
    assert!(texts(&outputs, OutputKind::Error).is_empty());
    assert!(!core.is_busy());
}

#[tokio::test]
async fn test_script_output_arrives_in_order_before_the_result() {
    let (core, mut rx) = simulated();
    core.submit(ExecutionRequest::script(
        "print('one')\narm.turn_right(45)\nprint('two')\n",
    ))
    .unwrap();
    let (outputs, result) = next_result(&mut rx).await;
    assert!(result.success, "{:?}", result.error);

    let lines: Vec<&str> = outputs.iter().map(|o| o.text.as_str()).collect();
    let one = lines.iter().position(|l| *l == "one").unwrap();
    let call = lines.iter().position(|l| *l == "arm.turn_right(45)").unwrap();
    let two = lines.iter().position(|l| *l == "two").unwrap();
    assert!(one < call && call < two);
    assert_eq!(core.arm_state().upper_arm.degrees(), 45);
    assert_eq!(core.controller_state(), LinkState::Mock);
}

#[tokio::test]
async fn test_runtime_fault_reports_line_number() {
    let (core, mut rx) = simulated();
    core.submit(ExecutionRequest::script("1/0")).unwrap();
    let (outputs, result) = next_result(&mut rx).await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::RuntimeFault);
    assert_eq!(error.line, Some(1));
    assert!(error.message.contains("division"));

    let errors: Vec<&OutputEvent> = outputs.iter().filter(|o| o.kind == OutputKind::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line, Some(1));
}

#[tokio::test]
async fn test_repl_namespace_persists_between_lines() {
    let (core, mut rx) = simulated();
    core.submit(ExecutionRequest::repl_line("x = 5")).unwrap();
    let (_, result) = next_result(&mut rx).await;
    assert!(result.success);
    assert!(core.is_repl_active());

    core.submit(ExecutionRequest::repl_line("print(x)")).unwrap();
    let (outputs, result) = next_result(&mut rx).await;
    assert!(result.success);
    assert_eq!(texts(&outputs, OutputKind::Stdout), vec!["5"]);

    let history: Vec<String> = core.history(5).into_iter().map(|e| e.command).collect();
    assert_eq!(history, vec!["print(x)", "x = 5"]);
}

#[tokio::test]
async fn test_scripts_are_refused_while_repl_is_active() {
    let (core, mut rx) = simulated();
    core.start_repl().unwrap();
    assert!(core.is_repl_active());
    assert_eq!(
        core.submit(ExecutionRequest::script("print(1)")),
        Err(SubmitError::ReplActive)
    );
    assert!(!core.is_busy());

    core.end_repl().unwrap();
    assert!(!core.is_repl_active());
    core.submit(ExecutionRequest::script("print(1)")).unwrap();
    let (_, result) = next_result(&mut rx).await;
    assert!(result.success);
}

#[tokio::test]
async fn test_reset_repl_forgets_definitions_and_history() {
    let (core, mut rx) = simulated();
    core.submit(ExecutionRequest::repl_line("x = 5")).unwrap();
    next_result(&mut rx).await;

    core.reset_repl().unwrap();
    assert!(core.history(10).is_empty());

    core.submit(ExecutionRequest::repl_line("print(x)")).unwrap();
    let (_, result) = next_result(&mut rx).await;
    assert_eq!(result.error.unwrap().kind, ErrorKind::RuntimeFault);
    assert_eq!(core.history(10).len(), 1);
}

#[tokio::test]
async fn test_submission_while_busy_is_rejected() {
    let (core, mut rx) = simulated();
    core.submit(ExecutionRequest::script("delay(0.5)")).unwrap();
    assert!(core.is_busy());

    assert_eq!(
        core.submit(ExecutionRequest::script("arm.grab()")),
        Err(SubmitError::Busy)
    );
    assert_eq!(core.start_repl(), Err(SubmitError::Busy));

    let (outputs, result) = next_result(&mut rx).await;
    assert!(result.success);
    assert!(!texts(&outputs, OutputKind::Status).contains(&"arm.grab()".to_string()));
    assert_eq!(core.arm_state(), ArmState::default());

    // Nothing from the refused submission shows up later.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_stop_cancels_a_long_delay() {
    let (core, mut rx) = simulated();
    core.submit(ExecutionRequest::script(
        "print('start')\ndelay(10)\nprint('never')\n",
    ))
    .unwrap();

    loop {
        let output = next_output(&mut rx).await;
        if output.text == "start" {
            break;
        }
    }
    core.stop();

    let (outputs, result) = next_result(&mut rx).await;
    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::Cancelled);
    assert!(result.duration < Duration::from_secs(5));
    assert!(!texts(&outputs, OutputKind::Stdout).contains(&"never".to_string()));
    assert!(!core.is_busy());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_stop_when_idle_does_nothing() {
    let (core, mut rx) = simulated();
    core.stop();
    core.submit(ExecutionRequest::script("print('ok')")).unwrap();
    let (_, result) = next_result(&mut rx).await;
    assert!(result.success);
}

#[tokio::test]
async fn test_rejected_angle_leaves_arm_unchanged() {
    let (core, mut rx) = simulated();
    core.submit(ExecutionRequest::script("arm.set_angle(200)")).unwrap();
    let (outputs, result) = next_result(&mut rx).await;

    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::RuntimeFault);
    assert!(error.message.contains("between 0 and 180"));
    assert_eq!(core.arm_state(), ArmState::default());
    assert!(!texts(&outputs, OutputKind::Status)
        .iter()
        .any(|line| line.contains("set_angle")));
}

#[tokio::test]
async fn test_silent_board_falls_back_to_simulation_with_one_warning() {
    let (core, mut rx) = Coordinator::with_connector(hardware_config(), Some(Box::new(SilentConnector)));
    assert_eq!(core.controller_state(), LinkState::Unselected);

    core.submit(ExecutionRequest::script("arm.turn_right(30)\narm.turn_right(30)\n"))
        .unwrap();
    let (outputs, result) = next_result(&mut rx).await;
    assert!(result.success, "{:?}", result.error);

    let status = texts(&outputs, OutputKind::Status);
    let warnings: Vec<usize> = status
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with("warning"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(warnings, vec![0]);
    assert_eq!(status[1], "arm.turn_right(30)");
    assert_eq!(core.controller_state(), LinkState::Mock);
    assert_eq!(core.arm_state().upper_arm.degrees(), 60);

    // Selection happens once per session.
    core.submit(ExecutionRequest::script("arm.grab()")).unwrap();
    let (outputs, _) = next_result(&mut rx).await;
    assert!(!texts(&outputs, OutputKind::Status)
        .iter()
        .any(|line| line.starts_with("warning")));
}

#[tokio::test]
async fn test_lost_board_fails_the_controller() {
    // Six acknowledgements attach and home the servos; the seventh covers the
    // first command of the program.
    let (core, mut rx) =
        Coordinator::with_connector(hardware_config(), Some(Box::new(TiringConnector(7))));
    let mut states = core.subscribe_controller_state();

    core.submit(ExecutionRequest::script(
        "arm.turn_right(10)\narm.turn_right(10)\nprint('unreachable')\n",
    ))
    .unwrap();
    let (outputs, result) = next_result(&mut rx).await;

    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::HardwareFault);
    assert_eq!(error.line, Some(2));
    assert_eq!(core.controller_state(), LinkState::Failed);
    assert_eq!(*states.borrow_and_update(), LinkState::Failed);
    assert!(texts(&outputs, OutputKind::Status)
        .iter()
        .any(|line| line.starts_with("warning: the arm hardware failed")));
    assert!(texts(&outputs, OutputKind::Stdout).is_empty());
    assert_eq!(core.arm_state().upper_arm.degrees(), 10);

    core.submit(ExecutionRequest::script("arm.grab()")).unwrap();
    let (_, result) = next_result(&mut rx).await;
    assert_eq!(result.error.unwrap().kind, ErrorKind::HardwareFault);
}

#[tokio::test]
async fn test_stop_while_a_command_waits_for_the_board_reports_cancelled() {
    let config = CoreConfig {
        hardware: HardwareConfig {
            handshake_timeout_ms: 10,
            command_timeout_ms: 1000,
            ..HardwareConfig::default()
        },
        ..CoreConfig::default()
    };
    let (core, mut rx) = Coordinator::with_connector(config, Some(Box::new(TiringConnector(6))));
    core.submit(ExecutionRequest::script("arm.grab()\nprint('after')\n"))
        .unwrap();

    let mut outputs = Vec::new();
    loop {
        let output = next_output(&mut rx).await;
        let echoed = output.text == "arm.grab()";
        outputs.push(output);
        if echoed {
            break;
        }
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    core.stop();

    let (rest, result) = next_result(&mut rx).await;
    outputs.extend(rest);
    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Cancelled);
    assert_eq!(error.message, "Execution stopped by user.");
    assert!(texts(&outputs, OutputKind::Stdout).is_empty());
    assert_eq!(
        texts(&outputs, OutputKind::Error),
        vec!["Execution stopped by user."]
    );

    // The board is still gone, and the status line says so.
    assert_eq!(core.controller_state(), LinkState::Failed);
    assert!(texts(&outputs, OutputKind::Status)
        .iter()
        .any(|line| line.starts_with("warning: the arm hardware failed")));
    assert!(!core.is_busy());
}

#[tokio::test]
async fn test_very_long_expression_is_a_syntax_fault() {
    let (core, mut rx) = simulated();
    let code = format!("x = 1{}\nprint(x)\n", "+1".repeat(10_000));
    core.submit(ExecutionRequest::script(code)).unwrap();
    let (outputs, result) = next_result(&mut rx).await;

    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::SyntaxFault);
    assert_eq!(error.line, Some(1));
    assert!(texts(&outputs, OutputKind::Stdout).is_empty());

    let code = format!("f = print\nf{}\n", "()".repeat(10_000));
    core.submit(ExecutionRequest::script(code)).unwrap();
    let (_, result) = next_result(&mut rx).await;
    assert_eq!(result.error.unwrap().kind, ErrorKind::SyntaxFault);

    core.submit(ExecutionRequest::script("print(1 + 1)")).unwrap();
    let (outputs, result) = next_result(&mut rx).await;
    assert!(result.success);
    assert_eq!(texts(&outputs, OutputKind::Stdout), vec!["2"]);
}

#[tokio::test]
async fn test_reset_repl_frees_a_deeply_nested_list() {
    let (core, mut rx) = simulated();
    core.submit(ExecutionRequest::repl_line("x = []")).unwrap();
    next_result(&mut rx).await;
    core.submit(ExecutionRequest::repl_line(
        "for i in range(1000000):\n    x = [x]\n",
    ))
    .unwrap();
    let (_, result) = next_result(&mut rx).await;
    assert!(result.success, "{:?}", result.error);

    core.reset_repl().unwrap();
    core.submit(ExecutionRequest::repl_line("print(x)")).unwrap();
    let (_, result) = next_result(&mut rx).await;
    assert_eq!(result.error.unwrap().kind, ErrorKind::RuntimeFault);

    core.submit(ExecutionRequest::repl_line("y = [[[]]]")).unwrap();
    next_result(&mut rx).await;
    core.submit(ExecutionRequest::repl_line(
        "for i in range(1000000):\n    y = [y]\n",
    ))
    .unwrap();
    next_result(&mut rx).await;
    core.end_repl().unwrap();
    assert!(!core.is_repl_active());

    core.submit(ExecutionRequest::script("print('still here')")).unwrap();
    let (outputs, result) = next_result(&mut rx).await;
    assert!(result.success);
    assert_eq!(texts(&outputs, OutputKind::Stdout), vec!["still here"]);
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_refuses_new_work() {
    let (core, mut rx) = simulated();
    core.submit(ExecutionRequest::script("delay(10)")).unwrap();
    core.shutdown();
    core.shutdown();

    let (_, result) = next_result(&mut rx).await;
    assert_eq!(result.error.unwrap().kind, ErrorKind::Cancelled);
    assert_eq!(
        core.submit(ExecutionRequest::script("print(1)")),
        Err(SubmitError::ShutDown)
    );
}
