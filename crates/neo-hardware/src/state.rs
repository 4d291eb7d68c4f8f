//! Arm state: joint angles and gripper position.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_ANGLE: i64 = 0;
pub const MAX_ANGLE: i64 = 180;
/// Hand servo angle when the gripper is closed.
pub const GRAB_ANGLE: Angle = Angle(60);
/// Hand servo angle when the gripper is open.
pub const RELEASE_ANGLE: Angle = Angle(0);

/// A servo angle in whole degrees, always within `0..=180`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Angle(u8);

impl Angle {
    /// Returns `None` when `degrees` is outside `0..=180`.
    pub fn new(degrees: i64) -> Option<Self> {
        if (MIN_ANGLE..=MAX_ANGLE).contains(&degrees) {
            Some(Self(degrees as u8))
        } else {
            None
        }
    }

    /// Clamps `degrees` into `0..=180`.
    pub fn saturating(degrees: i64) -> Self {
        Self(degrees.clamp(MIN_ANGLE, MAX_ANGLE) as u8)
    }

    pub fn degrees(self) -> i64 {
        i64::from(self.0)
    }

    /// The angle reached by turning left (towards 0) by `amount`.
    pub fn turned_left(self, amount: Angle) -> Angle {
        Angle::saturating(self.degrees() - amount.degrees())
    }

    /// The angle reached by turning right (towards 180) by `amount`.
    pub fn turned_right(self, amount: Angle) -> Angle {
        Angle::saturating(self.degrees() + amount.degrees())
    }
}

impl TryFrom<i64> for Angle {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Angle::new(value).ok_or_else(|| format!("angle {} is outside 0..=180", value))
    }
}

impl From<Angle> for i64 {
    fn from(angle: Angle) -> Self {
        angle.degrees()
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The servo-driven joints of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    /// Shoulder / base rotation.
    UpperArm,
    /// Elbow.
    LowerArm,
    /// Gripper servo.
    Hand,
}

impl Joint {
    pub const ALL: [Joint; 3] = [Joint::UpperArm, Joint::LowerArm, Joint::Hand];

    pub fn name(&self) -> &'static str {
        match self {
            Joint::UpperArm => "upper_arm",
            Joint::LowerArm => "lower_arm",
            Joint::Hand => "hand",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gripper {
    #[default]
    Open,
    Closed,
}

/// Snapshot of every joint angle and the gripper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArmState {
    pub upper_arm: Angle,
    pub lower_arm: Angle,
    pub hand: Angle,
    pub gripper: Gripper,
}

impl ArmState {
    pub fn angle(&self, joint: Joint) -> Angle {
        match joint {
            Joint::UpperArm => self.upper_arm,
            Joint::LowerArm => self.lower_arm,
            Joint::Hand => self.hand,
        }
    }

    pub fn set(&mut self, joint: Joint, angle: Angle) {
        match joint {
            Joint::UpperArm => self.upper_arm = angle,
            Joint::LowerArm => self.lower_arm = angle,
            Joint::Hand => self.hand = angle,
        }
    }

    /// Closes the gripper, moving the hand servo to [`GRAB_ANGLE`].
    pub fn close_gripper(&mut self) {
        self.hand = GRAB_ANGLE;
        self.gripper = Gripper::Closed;
    }

    /// Opens the gripper, moving the hand servo to [`RELEASE_ANGLE`].
    pub fn open_gripper(&mut self) {
        self.hand = RELEASE_ANGLE;
        self.gripper = Gripper::Open;
    }
}
