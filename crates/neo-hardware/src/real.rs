//! Controller for the physical arm.
//!
//! Protocol, one line each way:
//!
//! | host → board          | board → host          |
//! |-----------------------|-----------------------|
//! | `HELLO neo/1`         | `READY`               |
//! | `ATTACH <pin>`        | `OK` or `ERR <reason>`|
//! | `SERVO <pin> <angle>` | `OK` or `ERR <reason>`|
//! | `DETACH <pin>`        | `OK` or `ERR <reason>`|
//!
//! Every command blocks until its reply arrives or the per-command timeout
//! elapses. The in-memory state only changes after the board acknowledged.

use std::time::Duration;

use crate::config::{HardwareConfig, ServoPins};
use crate::controller::{ArmController, ControllerKind};
use crate::errors::HardwareError;
use crate::state::{Angle, ArmState, Joint, GRAB_ANGLE, RELEASE_ANGLE};
use crate::transport::Transport;

pub const HANDSHAKE: &str = "HELLO neo/1";
pub const READY: &str = "READY";

pub struct RealController {
    transport: Box<dyn Transport>,
    pins: ServoPins,
    command_timeout: Duration,
    state: ArmState,
    shut_down: bool,
}

impl RealController {
    /// Performs the handshake, attaches every servo and homes it to 0°.
    pub fn connect(
        mut transport: Box<dyn Transport>,
        config: &HardwareConfig,
    ) -> Result<Self, HardwareError> {
        transport
            .send_line(HANDSHAKE)
            .map_err(|e| HardwareError::Handshake(e.to_string()))?;
        let reply = transport
            .recv_line(config.handshake_timeout())
            .map_err(|e| HardwareError::Handshake(e.to_string()))?;
        if reply.trim() != READY {
            return Err(HardwareError::Handshake(format!(
                "unexpected reply '{}'",
                reply.trim()
            )));
        }
        log::info!("Arm board on {} is ready", transport.describe());

        let mut controller = Self {
            transport,
            pins: config.pins,
            command_timeout: config.command_timeout(),
            state: ArmState::default(),
            shut_down: false,
        };
        for joint in Joint::ALL {
            let pin = controller.pins.pin(joint);
            controller.command(&format!("ATTACH {}", pin))?;
            controller.command(&format!("SERVO {} 0", pin))?;
        }
        Ok(controller)
    }

    fn command(&mut self, line: &str) -> Result<(), HardwareError> {
        if self.shut_down {
            return Err(HardwareError::ShutDown);
        }
        log::debug!("-> {}", line);
        self.transport
            .send_line(line)
            .map_err(|e| HardwareError::from_transport(line, e))?;
        let reply = self
            .transport
            .recv_line(self.command_timeout)
            .map_err(|e| HardwareError::from_transport(line, e))?;
        log::debug!("<- {}", reply);

        let reply = reply.trim();
        if reply == "OK" {
            Ok(())
        } else if let Some(reason) = reply.strip_prefix("ERR") {
            Err(HardwareError::Device {
                command: line.to_string(),
                reason: reason.trim().to_string(),
            })
        } else {
            Err(HardwareError::Device {
                command: line.to_string(),
                reason: format!("unexpected reply '{}'", reply),
            })
        }
    }

    fn write_servo(&mut self, joint: Joint, angle: Angle) -> Result<(), HardwareError> {
        let pin = self.pins.pin(joint);
        self.command(&format!("SERVO {} {}", pin, angle))?;
        self.state.set(joint, angle);
        Ok(())
    }
}

impl ArmController for RealController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Real
    }

    fn turn_left(&mut self, joint: Joint, amount: Angle) -> Result<Angle, HardwareError> {
        let target = self.state.angle(joint).turned_left(amount);
        self.write_servo(joint, target)?;
        Ok(target)
    }

    fn turn_right(&mut self, joint: Joint, amount: Angle) -> Result<Angle, HardwareError> {
        let target = self.state.angle(joint).turned_right(amount);
        self.write_servo(joint, target)?;
        Ok(target)
    }

    fn set_angle(&mut self, joint: Joint, angle: Angle) -> Result<(), HardwareError> {
        self.write_servo(joint, angle)
    }

    fn grab(&mut self) -> Result<(), HardwareError> {
        self.write_servo(Joint::Hand, GRAB_ANGLE)?;
        self.state.close_gripper();
        Ok(())
    }

    fn release(&mut self) -> Result<(), HardwareError> {
        self.write_servo(Joint::Hand, RELEASE_ANGLE)?;
        self.state.open_gripper();
        Ok(())
    }

    fn get_angle(&self, joint: Joint) -> Angle {
        self.state.angle(joint)
    }

    fn state(&self) -> ArmState {
        self.state
    }

    fn shutdown(&mut self) -> Result<(), HardwareError> {
        if self.shut_down {
            return Ok(());
        }
        let mut first_error = None;
        for joint in Joint::ALL {
            let pin = self.pins.pin(joint);
            if let Err(e) = self.command(&format!("DETACH {}", pin)) {
                log::warn!("Failed to detach servo on pin {}: {}", pin, e);
                // A dead link will not answer the remaining detaches either.
                let link_down = matches!(e, HardwareError::Io(_) | HardwareError::AckTimeout { .. });
                first_error.get_or_insert(e);
                if link_down {
                    break;
                }
            }
        }
        self.shut_down = true;
        log::info!("Arm board on {} released", self.transport.describe());
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
