// Motor side of the robot
//
// Provides:
// - Output port specifiers and their resolution
// - The actuator seam (drive commands, rotation counters)
// - Feetech STS3215 serial protocol and an actuator backend built on it

pub mod actuator;
mod driver;
pub mod feetech;
pub mod port;

pub use actuator::{sync_powers, Actuator, ActuatorError, DriveCommand, MAX_POWER};
pub use driver::{FeetechActuator, DEFAULT_MOTOR_IDS, MAX_RAW_VELOCITY};
pub use feetech::{FeetechBus, FeetechError};
pub use port::{OutputPort, PortError, PortList, PortSpec};
