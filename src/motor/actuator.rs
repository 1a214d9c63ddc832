// Actuator seam: whatever turns drive commands into wheel motion and keeps
// the per-port rotation counters.

use super::feetech::FeetechError;
use super::port::{OutputPort, PortList};

/// Full-scale power, in percent
pub const MAX_POWER: i8 = 100;

/// Drive command as handed to an actuator backend. Backends must not block
/// until the motion completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCommand {
    /// Run each port until it has turned `target_degrees`; a negative target
    /// reverses the direction given by `power`
    Single {
        ports: PortList,
        power: i8,
        target_degrees: i32,
    },
    /// Run a pair with a fixed speed ratio, see [`sync_powers`]
    Synchronized {
        pair: [OutputPort; 2],
        power: i8,
        turn_bias: i8,
    },
    /// Zero power and brake
    Stop { ports: PortList },
}

#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("Motor bus error: {0}")]
    Bus(#[from] FeetechError),

    #[error("Port {0} is not connected to a motor")]
    Unmapped(OutputPort),
}

/// Implementations may block on I/O; callers in async code run them on the
/// blocking pool.
pub trait Actuator: Send + 'static {
    /// Start executing a command and return immediately
    fn apply(&mut self, command: &DriveCommand) -> Result<(), ActuatorError>;

    /// Zero the rotation counter of a port
    fn reset_rotation_count(&mut self, port: OutputPort) -> Result<(), ActuatorError>;

    /// Signed rotation of a port in degrees since its last reset
    fn rotation_count(&mut self, port: OutputPort) -> Result<i32, ActuatorError>;
}

/// Per-motor power for a synchronized pair.
///
/// The leading motor runs at `power`; the other one is scaled by
/// `(100 - 2*|bias|) / 100`, so bias 50 holds it still and bias 100 runs it
/// backwards at full power (an in-place turn). A positive bias slows the
/// second port, a negative bias the first.
pub fn sync_powers(power: i8, turn_bias: i8) -> [i8; 2] {
    let power = i16::from(power).clamp(-i16::from(MAX_POWER), i16::from(MAX_POWER));
    let bias = i16::from(turn_bias).clamp(-100, 100);
    let scaled = power * (100 - 2 * bias.abs()) / 100;

    // |scaled| <= |power| <= 100, both fit in i8
    let (power, scaled) = (power as i8, scaled as i8);
    if bias >= 0 {
        [power, scaled]
    } else {
        [scaled, power]
    }
}
