// Wheel geometry arithmetic
// Integer math with truncating division, matching the firmware the robot
// was calibrated against.

use super::error::{MotionError, Result};

/// Degrees in one motor revolution
pub const DEGREES_PER_ROTATION: i32 = 360;

/// Full rotations contained in `degrees`, truncated toward zero
pub fn degrees_to_rotations(degrees: i32) -> i32 {
    degrees / DEGREES_PER_ROTATION
}

pub fn rotations_to_degrees(rotations: i32) -> Result<i32> {
    rotations
        .checked_mul(DEGREES_PER_ROTATION)
        .ok_or(MotionError::Overflow {
            operation: "rotations_to_degrees",
        })
}

/// Motor degrees needed for a wheel of the given circumference to roll `mm`
pub fn mm_to_degrees(mm: i32, circumference_mm: u32) -> Result<i32> {
    if circumference_mm == 0 {
        return Err(MotionError::DivisionByZero {
            divisor: "circumference",
        });
    }
    let degrees = i64::from(mm) * i64::from(DEGREES_PER_ROTATION) / i64::from(circumference_mm);
    i32::try_from(degrees).map_err(|_| MotionError::Overflow {
        operation: "mm_to_degrees",
    })
}

/// Degrees each wheel of a differential base must turn, in opposite
/// directions, to rotate the base in place by `degrees`.
///
/// The wheels roll along a circle of diameter `track_width`, so each covers
/// `|degrees| * track_width / diameter` degrees of its own rotation.
pub fn base_turn_degrees(degrees: i32, diameter_mm: u32, track_width_mm: u32) -> Result<u32> {
    if diameter_mm == 0 {
        return Err(MotionError::DivisionByZero { divisor: "diameter" });
    }
    let target = u64::from(degrees.unsigned_abs()) * u64::from(track_width_mm) / u64::from(diameter_mm);
    u32::try_from(target).map_err(|_| MotionError::Overflow {
        operation: "base_turn_degrees",
    })
}

/// Turn ratio for an in-place turn: full bias in the direction of `degrees`.
/// A zero-degree turn gets no bias.
pub fn turn_bias(degrees: i32) -> i8 {
    degrees.signum() as i8 * 100
}
