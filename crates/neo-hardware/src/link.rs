//! Controller selection state machine.
//!
//! ```text
//! Unselected ──simulate / no device──▶ Mock
//!     │
//!     ▼
//! Connecting ──handshake ok──▶ Real ──fatal I/O──▶ Failed
//!     │
//!     └──handshake failed / timed out──▶ Mock   (warning, session continues)
//! ```
//!
//! Nothing leads back from `Failed`; a failed session short-circuits every
//! later command to [`HardwareError::ControllerFailed`].

use std::fmt;
use std::sync::Arc;

use neo_types::OutputSink;
use serde::{Deserialize, Serialize};

use crate::config::HardwareConfig;
use crate::controller::{ArmController, ControllerKind};
use crate::errors::HardwareError;
use crate::mock::MockController;
use crate::real::RealController;
use crate::state::ArmState;
use crate::transport::{Connector, DeviceConnector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Unselected,
    Connecting,
    Real,
    Mock,
    Failed,
}

impl LinkState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: LinkState) -> bool {
        use LinkState::*;
        matches!(
            (self, next),
            (Unselected, Connecting)
                | (Unselected, Mock)
                | (Connecting, Real)
                | (Connecting, Mock)
                | (Real, Failed)
        )
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Unselected => "unselected",
            LinkState::Connecting => "connecting",
            LinkState::Real => "real",
            LinkState::Mock => "mock",
            LinkState::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub type StateListener = Box<dyn Fn(LinkState) + Send>;

/// Owns the single controller handle of a session.
pub struct ControllerLink {
    state: LinkState,
    controller: Option<Box<dyn ArmController>>,
    connector: Option<Box<dyn Connector>>,
    config: HardwareConfig,
    sink: Arc<dyn OutputSink>,
    listener: Option<StateListener>,
    last_known: ArmState,
}

impl ControllerLink {
    /// Builds an unselected link. The connector is taken from `config.device`
    /// unless the configuration asks for simulation.
    pub fn new(config: HardwareConfig, sink: Arc<dyn OutputSink>) -> Self {
        let connector = config
            .device
            .clone()
            .map(|path| Box::new(DeviceConnector::new(path)) as Box<dyn Connector>);
        Self::with_connector(config, connector, sink)
    }

    /// Builds an unselected link around an explicit connector; `None` means
    /// "use the simulated arm only".
    pub fn with_connector(
        config: HardwareConfig,
        connector: Option<Box<dyn Connector>>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            state: LinkState::Unselected,
            controller: None,
            connector,
            config,
            sink,
            listener: None,
            last_known: ArmState::default(),
        }
    }

    /// Registers a callback invoked on every state change.
    pub fn on_state_change(&mut self, listener: StateListener) {
        listener(self.state);
        self.listener = Some(listener);
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// The current arm state, or the last one seen before the controller went away.
    pub fn arm_state(&self) -> ArmState {
        self.controller
            .as_ref()
            .map(|c| c.state())
            .unwrap_or(self.last_known)
    }

    fn transition(&mut self, next: LinkState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal controller transition {} -> {}",
            self.state,
            next
        );
        log::debug!("Controller link {} -> {}", self.state, next);
        self.state = next;
        if let Some(listener) = &self.listener {
            listener(next);
        }
    }

    /// Runs the selection once; later calls are no-ops.
    ///
    /// May block for up to the handshake timeout while connecting.
    pub fn ensure_selected(&mut self) {
        if self.state != LinkState::Unselected {
            return;
        }

        let connector = match self.connector.take() {
            Some(connector) if !self.config.simulate => connector,
            _ => {
                log::info!("Using the simulated arm");
                self.sink.status("[system] simulation mode: no arm hardware in use");
                self.install_mock();
                return;
            }
        };

        self.transition(LinkState::Connecting);
        let target = connector.describe();
        log::info!("Connecting to arm on {}", target);

        let connected = connector
            .connect()
            .map_err(|e| HardwareError::Handshake(e.to_string()))
            .and_then(|transport| RealController::connect(transport, &self.config));

        match connected {
            Ok(real) => {
                self.controller = Some(Box::new(real));
                self.transition(LinkState::Real);
                self.sink.status(&format!("[system] connected to arm on {}", target));
            }
            Err(e) => {
                log::warn!("Arm on {} unavailable ({}); falling back to simulation", target, e);
                self.sink.status(&format!(
                    "warning: could not connect to the arm on {} ({}); running in simulation mode",
                    target, e
                ));
                self.install_mock();
            }
        }
    }

    fn install_mock(&mut self) {
        self.controller = Some(Box::new(MockController::new(self.sink.clone())));
        self.transition(LinkState::Mock);
    }

    /// Runs `op` against the active controller.
    ///
    /// A fatal error from the real controller moves the link to `Failed` and
    /// releases the handle; the error itself is still returned to the caller.
    pub fn with_controller<T>(
        &mut self,
        op: impl FnOnce(&mut dyn ArmController) -> Result<T, HardwareError>,
    ) -> Result<T, HardwareError> {
        self.ensure_selected();
        if self.state == LinkState::Failed {
            return Err(HardwareError::ControllerFailed);
        }
        let controller = self.controller.as_mut().ok_or(HardwareError::ShutDown)?;
        let result = op(controller.as_mut());

        if let Err(e) = &result {
            if controller.kind() == ControllerKind::Real && e.is_fatal() {
                log::error!("Arm controller failed: {}", e);
                self.fail();
            }
        }
        result
    }

    fn fail(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            self.last_known = controller.state();
            if let Err(e) = controller.shutdown() {
                log::debug!("Ignoring shutdown error on failed controller: {}", e);
            }
        }
        self.transition(LinkState::Failed);
    }

    /// Releases the controller handle. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            self.last_known = controller.state();
            if let Err(e) = controller.shutdown() {
                log::warn!("Arm controller shutdown reported: {}", e);
            }
        }
    }
}

impl Drop for ControllerLink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::real::tests::{ready_board, ScriptedTransport};
    use crate::state::{Angle, Joint};
    use crate::transport::Transport;
    use neo_types::{MemorySink, OutputKind};
    use std::sync::Mutex;

    struct FixedConnector(Mutex<Option<ScriptedTransport>>);

    impl FixedConnector {
        fn boxed(transport: ScriptedTransport) -> Option<Box<dyn Connector>> {
            Some(Box::new(FixedConnector(Mutex::new(Some(transport)))))
        }
    }

    impl Connector for FixedConnector {
        fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
            match self.0.lock().unwrap().take() {
                Some(t) => Ok(Box::new(t)),
                None => Err(TransportError::Closed),
            }
        }

        fn describe(&self) -> String {
            "test-board".to_string()
        }
    }

    fn ninety() -> Angle {
        Angle::new(90).unwrap()
    }

    #[test]
    fn test_transition_table() {
        assert!(LinkState::Unselected.can_transition_to(LinkState::Mock));
        assert!(LinkState::Connecting.can_transition_to(LinkState::Mock));
        assert!(LinkState::Real.can_transition_to(LinkState::Failed));
        assert!(!LinkState::Failed.can_transition_to(LinkState::Real));
        assert!(!LinkState::Mock.can_transition_to(LinkState::Real));
    }

    #[test]
    fn test_no_connector_selects_mock_directly() {
        let sink = Arc::new(MemorySink::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut link = ControllerLink::with_connector(HardwareConfig::default(), None, sink.clone());
        let record = seen.clone();
        link.on_state_change(Box::new(move |s| record.lock().unwrap().push(s)));

        link.ensure_selected();
        assert_eq!(link.state(), LinkState::Mock);
        assert_eq!(*seen.lock().unwrap(), vec![LinkState::Unselected, LinkState::Mock]);
        assert!(!sink.lines(OutputKind::Status)[0].starts_with("warning"));
    }

    #[test]
    fn test_simulate_flag_skips_connector() {
        let board = ready_board();
        let mut link = ControllerLink::with_connector(
            HardwareConfig::simulated(),
            FixedConnector::boxed(board.clone()),
            Arc::new(MemorySink::new()),
        );
        link.ensure_selected();
        assert_eq!(link.state(), LinkState::Mock);
        assert!(board.sent().is_empty());
    }

    #[test]
    fn test_handshake_failure_falls_back_with_one_warning() {
        let sink = Arc::new(MemorySink::new());
        let mut link = ControllerLink::with_connector(
            HardwareConfig::default(),
            FixedConnector::boxed(ScriptedTransport::default()),
            sink.clone(),
        );
        link.ensure_selected();
        link.ensure_selected();
        assert_eq!(link.state(), LinkState::Mock);

        let warnings: Vec<_> = sink
            .lines(OutputKind::Status)
            .into_iter()
            .filter(|l| l.starts_with("warning"))
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("test-board"));

        link.with_controller(|c| c.turn_right(Joint::UpperArm, ninety())).unwrap();
        assert_eq!(link.arm_state().upper_arm, ninety());
    }

    #[test]
    fn test_real_failure_is_terminal() {
        let board = ready_board();
        let mut link = ControllerLink::with_connector(
            HardwareConfig::default(),
            FixedConnector::boxed(board.clone()),
            Arc::new(MemorySink::new()),
        );
        link.ensure_selected();
        assert_eq!(link.state(), LinkState::Real);

        board.ack(1);
        link.with_controller(|c| c.turn_right(Joint::UpperArm, ninety())).unwrap();

        board.silence();
        let err = link.with_controller(|c| c.grab()).unwrap_err();
        assert!(matches!(err, HardwareError::AckTimeout { .. }));
        assert_eq!(link.state(), LinkState::Failed);

        let sent_before = board.sent().len();
        board.ack(5);
        let err = link.with_controller(|c| c.grab()).unwrap_err();
        assert_eq!(err, HardwareError::ControllerFailed);
        assert_eq!(board.sent().len(), sent_before);
        assert_eq!(link.arm_state().upper_arm, ninety());
    }
}
