//! Simulated arm for classrooms without hardware.
//!
//! Applies exactly the state transitions the real controller would and
//! describes each one on the output sink instead of moving a servo.

use std::sync::Arc;

use neo_types::OutputSink;

use crate::controller::{ArmController, ControllerKind};
use crate::errors::HardwareError;
use crate::state::{Angle, ArmState, Joint};

pub struct MockController {
    state: ArmState,
    sink: Arc<dyn OutputSink>,
    commands: usize,
    shut_down: bool,
}

impl MockController {
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            state: ArmState::default(),
            sink,
            commands: 0,
            shut_down: false,
        }
    }

    /// Number of motion commands carried out so far.
    pub fn commands_executed(&self) -> usize {
        self.commands
    }

    fn begin(&mut self) -> Result<(), HardwareError> {
        if self.shut_down {
            return Err(HardwareError::ShutDown);
        }
        self.commands += 1;
        Ok(())
    }

    fn report(&self, joint: Joint, call: &str, angle: Angle) {
        self.sink
            .status(&format!("[{}] {} -> {} deg", joint, call, angle));
    }
}

impl ArmController for MockController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Mock
    }

    fn turn_left(&mut self, joint: Joint, amount: Angle) -> Result<Angle, HardwareError> {
        self.begin()?;
        let target = self.state.angle(joint).turned_left(amount);
        self.report(joint, &format!("turn_left({})", amount), target);
        self.state.set(joint, target);
        Ok(target)
    }

    fn turn_right(&mut self, joint: Joint, amount: Angle) -> Result<Angle, HardwareError> {
        self.begin()?;
        let target = self.state.angle(joint).turned_right(amount);
        self.report(joint, &format!("turn_right({})", amount), target);
        self.state.set(joint, target);
        Ok(target)
    }

    fn set_angle(&mut self, joint: Joint, angle: Angle) -> Result<(), HardwareError> {
        self.begin()?;
        self.report(joint, &format!("set_angle({})", angle), angle);
        self.state.set(joint, angle);
        Ok(())
    }

    fn grab(&mut self) -> Result<(), HardwareError> {
        self.begin()?;
        self.state.close_gripper();
        self.report(Joint::Hand, "grab()", self.state.hand);
        Ok(())
    }

    fn release(&mut self) -> Result<(), HardwareError> {
        self.begin()?;
        self.state.open_gripper();
        self.report(Joint::Hand, "release()", self.state.hand);
        Ok(())
    }

    fn get_angle(&self, joint: Joint) -> Angle {
        self.state.angle(joint)
    }

    fn state(&self) -> ArmState {
        self.state
    }

    fn shutdown(&mut self) -> Result<(), HardwareError> {
        if !self.shut_down {
            self.shut_down = true;
            self.sink.status("[system] simulated arm shut down");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Gripper;
    use neo_types::{MemorySink, OutputKind};

    fn angle(d: i64) -> Angle {
        Angle::new(d).unwrap()
    }

    #[test]
    fn test_mock_moves_and_reports() {
        let sink = Arc::new(MemorySink::new());
        let mut arm = MockController::new(sink.clone());

        assert_eq!(arm.turn_right(Joint::UpperArm, angle(90)).unwrap(), angle(90));
        assert_eq!(arm.turn_left(Joint::UpperArm, angle(30)).unwrap(), angle(60));
        arm.set_angle(Joint::LowerArm, angle(45)).unwrap();

        assert_eq!(arm.get_angle(Joint::UpperArm), angle(60));
        assert_eq!(arm.get_angle(Joint::LowerArm), angle(45));
        assert_eq!(arm.commands_executed(), 3);
        assert_eq!(
            sink.lines(OutputKind::Status),
            vec![
                "[upper_arm] turn_right(90) -> 90 deg",
                "[upper_arm] turn_left(30) -> 60 deg",
                "[lower_arm] set_angle(45) -> 45 deg",
            ]
        );
    }

    #[test]
    fn test_mock_turn_saturates() {
        let mut arm = MockController::new(Arc::new(MemorySink::new()));
        assert_eq!(arm.turn_left(Joint::UpperArm, angle(90)).unwrap(), angle(0));
        arm.set_angle(Joint::UpperArm, angle(170)).unwrap();
        assert_eq!(arm.turn_right(Joint::UpperArm, angle(90)).unwrap(), angle(180));
    }

    #[test]
    fn test_mock_gripper() {
        let mut arm = MockController::new(Arc::new(MemorySink::new()));
        arm.grab().unwrap();
        assert_eq!(arm.state().gripper, Gripper::Closed);
        assert_eq!(arm.get_angle(Joint::Hand), angle(60));
        arm.release().unwrap();
        assert_eq!(arm.state().gripper, Gripper::Open);
        assert_eq!(arm.get_angle(Joint::Hand), angle(0));
    }

    #[test]
    fn test_mock_rejects_commands_after_shutdown() {
        let sink = Arc::new(MemorySink::new());
        let mut arm = MockController::new(sink.clone());
        arm.shutdown().unwrap();
        arm.shutdown().unwrap();
        assert_eq!(arm.grab(), Err(HardwareError::ShutDown));
        assert_eq!(sink.lines(OutputKind::Status).len(), 1);
    }
}
