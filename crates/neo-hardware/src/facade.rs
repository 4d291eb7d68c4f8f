//! Beginner-facing arm API.
//!
//! Student code calls `arm.turn_left(45)`; the facade checks the argument,
//! echoes the call on the status channel and forwards it to whichever
//! controller the link selected. Invalid arguments never reach a controller.

use std::sync::Arc;
use std::time::Duration;

use neo_types::OutputSink;

use crate::config::HardwareConfig;
use crate::errors::FacadeError;
use crate::link::{ControllerLink, LinkState};
use crate::state::{Angle, ArmState, Joint, MAX_ANGLE, MIN_ANGLE};

/// Angle used when a turn is requested without one.
pub const DEFAULT_TURN: i64 = 90;

pub struct HardwareFacade {
    link: ControllerLink,
    sink: Arc<dyn OutputSink>,
}

impl HardwareFacade {
    pub fn new(link: ControllerLink, sink: Arc<dyn OutputSink>) -> Self {
        Self { link, sink }
    }

    /// A facade over a link built from `config`.
    pub fn from_config(config: HardwareConfig, sink: Arc<dyn OutputSink>) -> Self {
        Self::new(ControllerLink::new(config, sink.clone()), sink)
    }

    pub fn link(&self) -> &ControllerLink {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut ControllerLink {
        &mut self.link
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    pub fn arm_state(&self) -> ArmState {
        self.link.arm_state()
    }

    /// Selects a controller if that has not happened yet.
    pub fn connect(&mut self) {
        self.link.ensure_selected();
    }

    /// Announces an accepted call. Selection runs first so that a connection
    /// warning precedes the first command's output.
    fn echo(&mut self, call: String) {
        self.link.ensure_selected();
        self.sink.status(&format!("arm.{}", call));
    }

    pub fn turn_left(&mut self, amount: Option<i64>) -> Result<i64, FacadeError> {
        self.turn(Joint::UpperArm, "turn_left", amount, Direction::Left)
    }

    pub fn turn_right(&mut self, amount: Option<i64>) -> Result<i64, FacadeError> {
        self.turn(Joint::UpperArm, "turn_right", amount, Direction::Right)
    }

    pub fn elbow_left(&mut self, amount: Option<i64>) -> Result<i64, FacadeError> {
        self.turn(Joint::LowerArm, "elbow_left", amount, Direction::Left)
    }

    pub fn elbow_right(&mut self, amount: Option<i64>) -> Result<i64, FacadeError> {
        self.turn(Joint::LowerArm, "elbow_right", amount, Direction::Right)
    }

    fn turn(
        &mut self,
        joint: Joint,
        name: &str,
        amount: Option<i64>,
        direction: Direction,
    ) -> Result<i64, FacadeError> {
        let amount = checked_angle(amount.unwrap_or(DEFAULT_TURN))?;
        self.echo(format!("{}({})", name, amount));
        let reached = self.link.with_controller(|c| match direction {
            Direction::Left => c.turn_left(joint, amount),
            Direction::Right => c.turn_right(joint, amount),
        })?;
        Ok(reached.degrees())
    }

    pub fn set_angle(&mut self, angle: i64) -> Result<(), FacadeError> {
        let angle = checked_angle(angle)?;
        self.echo(format!("set_angle({})", angle));
        self.link
            .with_controller(|c| c.set_angle(Joint::UpperArm, angle))?;
        Ok(())
    }

    pub fn grab(&mut self) -> Result<(), FacadeError> {
        self.echo("grab()".to_string());
        self.link.with_controller(|c| c.grab())?;
        Ok(())
    }

    pub fn release(&mut self) -> Result<(), FacadeError> {
        self.echo("release()".to_string());
        self.link.with_controller(|c| c.release())?;
        Ok(())
    }

    /// The upper-arm angle.
    pub fn get_angle(&mut self) -> Result<i64, FacadeError> {
        let angle = self
            .link
            .with_controller(|c| Ok(c.get_angle(Joint::UpperArm)))?;
        Ok(angle.degrees())
    }

    /// Validates a pause length. The caller performs the wait so that it can
    /// observe cancellation while sleeping.
    pub fn delay(&mut self, seconds: f64) -> Result<Duration, FacadeError> {
        let invalid = || {
            FacadeError::InvalidArgument(format!(
                "delay needs a number of seconds that is 0 or more, but got {}",
                seconds
            ))
        };
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid());
        }
        let pause = Duration::try_from_secs_f64(seconds).map_err(|_| invalid())?;
        self.echo(format!("delay({})", seconds));
        Ok(pause)
    }

    pub fn shutdown(&mut self) {
        self.link.shutdown();
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Left,
    Right,
}

fn checked_angle(value: i64) -> Result<Angle, FacadeError> {
    Angle::new(value).ok_or_else(|| {
        FacadeError::InvalidArgument(format!(
            "angle must be between {} and {}, but got {}",
            MIN_ANGLE, MAX_ANGLE, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Gripper;
    use neo_types::{MemorySink, OutputKind};

    fn facade() -> (HardwareFacade, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let link = ControllerLink::with_connector(HardwareConfig::default(), None, sink.clone());
        (HardwareFacade::new(link, sink.clone()), sink)
    }

    #[test]
    fn test_out_of_range_angle_never_reaches_controller() {
        let (mut arm, sink) = facade();
        arm.connect();
        sink.clear();

        for bad in [-1, 181, 1000, i64::MIN] {
            let err = arm.set_angle(bad).unwrap_err();
            match err {
                FacadeError::InvalidArgument(msg) => assert!(msg.contains("between 0 and 180")),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(sink.events().is_empty());
        assert_eq!(arm.arm_state(), ArmState::default());
    }

    #[test]
    fn test_turns_default_to_ninety() {
        let (mut arm, sink) = facade();
        assert_eq!(arm.turn_right(None).unwrap(), 90);
        assert_eq!(arm.elbow_right(Some(45)).unwrap(), 45);
        assert_eq!(arm.turn_left(Some(30)).unwrap(), 60);
        assert_eq!(arm.get_angle().unwrap(), 60);

        let status = sink.lines(OutputKind::Status);
        assert!(status.contains(&"arm.turn_right(90)".to_string()));
        assert!(status.contains(&"[lower_arm] turn_right(45) -> 45 deg".to_string()));
    }

    #[test]
    fn test_turn_amount_is_validated() {
        let (mut arm, _) = facade();
        assert!(matches!(arm.turn_left(Some(-5)), Err(FacadeError::InvalidArgument(_))));
        assert!(matches!(arm.elbow_right(Some(270)), Err(FacadeError::InvalidArgument(_))));
    }

    #[test]
    fn test_grab_and_release() {
        let (mut arm, _) = facade();
        arm.grab().unwrap();
        assert_eq!(arm.arm_state().gripper, Gripper::Closed);
        arm.release().unwrap();
        assert_eq!(arm.arm_state().gripper, Gripper::Open);
    }

    #[test]
    fn test_delay_validation() {
        let (mut arm, _) = facade();
        assert_eq!(arm.delay(0.5).unwrap(), Duration::from_millis(500));
        assert_eq!(arm.delay(0.0).unwrap(), Duration::ZERO);
        assert!(matches!(arm.delay(-1.0), Err(FacadeError::InvalidArgument(_))));
        assert!(matches!(arm.delay(f64::NAN), Err(FacadeError::InvalidArgument(_))));
        assert!(matches!(arm.delay(f64::INFINITY), Err(FacadeError::InvalidArgument(_))));
    }
}
