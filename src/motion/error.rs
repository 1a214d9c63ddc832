use std::time::Duration;

use super::turn::TurnPhase;
use crate::motor::ActuatorError;

#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("Division by zero: {divisor} is 0")]
    DivisionByZero { divisor: &'static str },

    #[error("Result of {operation} does not fit the target range")]
    Overflow { operation: &'static str },

    #[error("Expected {expected} ports, got {got}")]
    PortCount { expected: &'static str, got: usize },

    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("Actuator call did not complete: {0}")]
    ActuatorTask(#[from] tokio::task::JoinError),

    #[error("Maneuver timed out after {elapsed:?} while {phase:?}")]
    ManeuverTimeout { phase: TurnPhase, elapsed: Duration },
}

pub type Result<T> = std::result::Result<T, MotionError>;
