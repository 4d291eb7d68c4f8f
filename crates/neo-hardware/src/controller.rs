//! The arm controller capability set.
//!
//! Two implementations exist: [`crate::real::RealController`] talks to the board
//! over a [`crate::transport::Transport`], [`crate::mock::MockController`] performs
//! the same state transitions in memory. Callers never pick one directly; the
//! [`crate::link::ControllerLink`] state machine does.

use crate::errors::HardwareError;
use crate::state::{Angle, ArmState, Joint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    Real,
    Mock,
}

/// Joint motion and gripper control.
///
/// Arguments are already validated: every `Angle` is within range. Turning
/// saturates at the ends of travel. Each method returns once the motion has
/// been carried out (or acknowledged by the device).
pub trait ArmController: Send {
    fn kind(&self) -> ControllerKind;

    /// Turns `joint` towards 0° by `amount`; returns the new angle.
    fn turn_left(&mut self, joint: Joint, amount: Angle) -> Result<Angle, HardwareError>;

    /// Turns `joint` towards 180° by `amount`; returns the new angle.
    fn turn_right(&mut self, joint: Joint, amount: Angle) -> Result<Angle, HardwareError>;

    fn set_angle(&mut self, joint: Joint, angle: Angle) -> Result<(), HardwareError>;

    fn grab(&mut self) -> Result<(), HardwareError>;

    fn release(&mut self) -> Result<(), HardwareError>;

    fn get_angle(&self, joint: Joint) -> Angle;

    fn state(&self) -> ArmState;

    /// Releases the underlying resource. Calling it twice is harmless.
    fn shutdown(&mut self) -> Result<(), HardwareError>;
}
