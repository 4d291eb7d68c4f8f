//! # neo-hardware
//!
//! Everything between a student's `arm.grab()` and a servo moving:
//!
//! - [`facade::HardwareFacade`] validates calls and echoes them to the console
//! - [`link::ControllerLink`] picks the real or simulated controller once per session
//! - [`real::RealController`] speaks the line protocol over a [`transport::Transport`]
//! - [`mock::MockController`] applies the same transitions in memory
//!
//! All calls are blocking; the execution engine drives them from its worker thread.

pub mod config;
pub mod controller;
pub mod errors;
pub mod facade;
pub mod link;
pub mod mock;
pub mod real;
pub mod state;
pub mod transport;

pub use config::{HardwareConfig, ServoPins};
pub use controller::{ArmController, ControllerKind};
pub use errors::{FacadeError, HardwareError, TransportError};
pub use facade::HardwareFacade;
pub use link::{ControllerLink, LinkState};
pub use mock::MockController;
pub use real::RealController;
pub use state::{Angle, ArmState, Gripper, Joint, MAX_ANGLE, MIN_ANGLE};
pub use transport::{Connector, DeviceConnector, DeviceTransport, Transport};
