// Motion control for the differential base
//
// Provides:
// - Wheel geometry arithmetic
// - The motion subsystem: one lock over the actuator and the scratch record
// - Locked unit conversions and wheel-distance moves
// - Synchronized in-place turns

mod convert;
mod error;
pub mod geometry;
mod issuer;
mod subsystem;
mod turn;

pub use error::{MotionError, Result};
pub use issuer::MotorCommandIssuer;
pub use subsystem::{MotionSettings, MotionSubsystem, Scratch};
pub use turn::TurnPhase;
