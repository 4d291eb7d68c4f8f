//! Hardware configuration: servo pins, device location and timeouts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::state::Joint;

/// Which board pin drives each servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoPins {
    #[serde(default = "default_upper_arm_pin")]
    pub upper_arm: u8,
    #[serde(default = "default_lower_arm_pin")]
    pub lower_arm: u8,
    #[serde(default = "default_hand_pin")]
    pub hand: u8,
}

impl ServoPins {
    pub fn pin(&self, joint: Joint) -> u8 {
        match joint {
            Joint::UpperArm => self.upper_arm,
            Joint::LowerArm => self.lower_arm,
            Joint::Hand => self.hand,
        }
    }
}

impl Default for ServoPins {
    fn default() -> Self {
        Self {
            upper_arm: default_upper_arm_pin(),
            lower_arm: default_lower_arm_pin(),
            hand: default_hand_pin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(default)]
    pub pins: ServoPins,
    /// Skip the device entirely and drive the simulated arm.
    #[serde(default)]
    pub simulate: bool,
    /// Device node of the arm's board, e.g. `/dev/ttyACM0`.
    #[serde(default)]
    pub device: Option<PathBuf>,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl HardwareConfig {
    /// A configuration that never touches a device.
    pub fn simulated() -> Self {
        Self {
            simulate: true,
            ..Self::default()
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            pins: ServoPins::default(),
            simulate: false,
            device: None,
            handshake_timeout_ms: default_handshake_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

fn default_upper_arm_pin() -> u8 { 9 }
fn default_lower_arm_pin() -> u8 { 10 }
fn default_hand_pin() -> u8 { 11 }
fn default_handshake_timeout_ms() -> u64 { 3000 }
fn default_command_timeout_ms() -> u64 { 2000 }
