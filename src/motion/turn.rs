// In-place turns of the differential base
//
// A maneuver runs Idle -> Draining -> Driving -> Stopped -> Idle while holding
// the motion lock:
//   Draining  reset both rotation counters and read them back until both
//             read zero right after a reset
//   Driving   run the pair synchronized with full turn bias and poll until
//             both wheels have turned at least the target
//   Stopped   brake the pair
// Completion is coupled: the faster wheel keeps running (and overshoots)
// until the slower one has reached the target too.

use serde::{Deserialize, Serialize};
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::error::{MotionError, Result};
use super::geometry::{base_turn_degrees, turn_bias};
use super::subsystem::{MotionCore, MotionSubsystem, Scratch};
use crate::motor::{Actuator, OutputPort, PortSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    Draining,
    Driving,
    Stopped,
}

impl<A: Actuator> MotionSubsystem<A> {
    /// Turn the base in place by `degrees` (positive turns toward the second
    /// port of the pair). Returns the degrees each wheel was driven.
    ///
    /// A zero-degree turn does nothing and returns 0.
    pub async fn rotate_base_degrees(
        &self,
        spec: PortSpec,
        power: i8,
        degrees: i32,
        diameter_mm: u32,
        track_width_mm: u32,
    ) -> Result<u32> {
        let mut core = self.core.lock().await;

        let ports = spec.resolve();
        let pair = ports.pair().ok_or(MotionError::PortCount {
            expected: "2",
            got: ports.len(),
        })?;
        let bias = turn_bias(degrees);
        let target = base_turn_degrees(degrees, diameter_mm, track_width_mm)?;
        core.scratch = Scratch {
            degrees: degrees.into(),
            diameter: diameter_mm.into(),
            center_distance: track_width_mm.into(),
            result: target.into(),
            ..Scratch::default()
        };

        if degrees == 0 {
            debug!("Zero-degree turn requested, nothing to do");
            return Ok(0);
        }

        info!(
            "Turning {} degrees on {:?}: {} wheel degrees at power {}",
            degrees, pair, target, power
        );
        let started = Instant::now();
        let outcome = match self.settings.maneuver_timeout {
            Some(limit) => timeout(limit, self.maneuver(&mut core, pair, power, bias, target))
                .await
                .unwrap_or_else(|_| {
                    Err(MotionError::ManeuverTimeout {
                        phase: self.phase(),
                        elapsed: started.elapsed(),
                    })
                }),
            None => self.maneuver(&mut core, pair, power, bias, target).await,
        };

        if let Err(e) = &outcome {
            warn!("Turn aborted: {}", e);
            self.set_phase(TurnPhase::Stopped);
            if let Err(stop_err) = core.issuer.stop(ports).await {
                warn!("Failed to stop motors after aborted turn: {}", stop_err);
            }
        }
        self.set_phase(TurnPhase::Idle);
        outcome.map(|()| target)
    }

    async fn maneuver(
        &self,
        core: &mut MotionCore<A>,
        pair: [OutputPort; 2],
        power: i8,
        bias: i8,
        target: u32,
    ) -> Result<()> {
        let mut tick = interval(self.settings.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.set_phase(TurnPhase::Draining);
        let mut resets = 0u32;
        loop {
            resets += 1;
            for port in pair {
                core.issuer.reset_rotation_count(port).await?;
            }
            let counts = [
                core.issuer.rotation_count(pair[0]).await?,
                core.issuer.rotation_count(pair[1]).await?,
            ];
            if counts == [0, 0] {
                break;
            }
            debug!("Counters read {:?} right after reset", counts);
            tick.tick().await;
        }
        debug!("Rotation counters drained after {} resets", resets);

        self.set_phase(TurnPhase::Driving);
        core.issuer.drive_synchronized(pair.into(), power, bias).await?;
        loop {
            let counts = [
                core.issuer.rotation_count(pair[0]).await?,
                core.issuer.rotation_count(pair[1]).await?,
            ];
            if counts.iter().all(|count| count.unsigned_abs() >= target) {
                debug!("Turn target {} reached at {:?}", target, counts);
                break;
            }
            tick.tick().await;
        }

        self.set_phase(TurnPhase::Stopped);
        core.issuer.stop(pair.into()).await
    }
}
