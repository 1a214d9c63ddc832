// Unit conversions run under the motion lock
//
// The math itself lives in `geometry`; these entry points serialize it with
// everything else touching the motion subsystem and leave their inputs and
// result in the scratch record.

use tracing::debug;

use super::error::Result;
use super::geometry;
use super::subsystem::{MotionSubsystem, Scratch};
use crate::motor::{Actuator, PortSpec};

impl<A: Actuator> MotionSubsystem<A> {
    pub async fn degrees_to_rotations(&self, degrees: i32) -> i32 {
        let mut core = self.core.lock().await;
        let rotations = geometry::degrees_to_rotations(degrees);
        core.scratch = Scratch {
            degrees: degrees.into(),
            rotations: rotations.into(),
            result: rotations.into(),
            ..Scratch::default()
        };
        rotations
    }

    pub async fn rotations_to_degrees(&self, rotations: i32) -> Result<i32> {
        let mut core = self.core.lock().await;
        core.scratch = Scratch {
            rotations: rotations.into(),
            ..Scratch::default()
        };
        let degrees = geometry::rotations_to_degrees(rotations)?;
        core.scratch.degrees = degrees.into();
        core.scratch.result = degrees.into();
        Ok(degrees)
    }

    pub async fn mm_to_degrees(&self, mm: i32, circumference_mm: u32) -> Result<i32> {
        let mut core = self.core.lock().await;
        core.scratch = Scratch {
            distance: mm.into(),
            circumference: circumference_mm.into(),
            ..Scratch::default()
        };
        let degrees = geometry::mm_to_degrees(mm, circumference_mm)?;
        core.scratch.degrees = degrees.into();
        core.scratch.result = degrees.into();
        Ok(degrees)
    }

    /// Roll the wheels on `spec` forward by `mm`. Returns the motor degrees
    /// commanded as soon as the actuator accepted the move.
    pub async fn rotate_motor_mm(&self, spec: PortSpec, power: i8, mm: i32, circumference_mm: u32) -> Result<i32> {
        let mut core = self.core.lock().await;
        core.scratch = Scratch {
            distance: mm.into(),
            circumference: circumference_mm.into(),
            ..Scratch::default()
        };
        let degrees = geometry::mm_to_degrees(mm, circumference_mm)?;
        core.scratch.degrees = degrees.into();
        core.scratch.result = degrees.into();

        debug!("Rolling {}mm = {} motor degrees on {:?}", mm, degrees, spec);
        core.issuer.drive_single(spec.resolve(), power, degrees).await?;
        Ok(degrees)
    }
}
