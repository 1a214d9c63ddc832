// The motion subsystem: actuator plus scratch record behind one lock
//
// Every conversion and every maneuver takes this lock for its whole run, so
// all motion work in the process is totally ordered. A turn holds it for the
// full physical maneuver, not just for its arithmetic.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use super::error::Result;
use super::issuer::MotorCommandIssuer;
use super::turn::TurnPhase;
use crate::config::{MANEUVER_TIMEOUT, POLL_INTERVAL};
use crate::motor::{Actuator, PortSpec};

/// Inputs and result of the last locked computation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Scratch {
    pub degrees: i64,
    pub rotations: i64,
    pub distance: i64,
    pub circumference: i64,
    pub diameter: i64,
    pub center_distance: i64,
    pub result: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSettings {
    /// Pause between rotation counter polls
    pub poll_interval: Duration,
    /// Upper bound for drain plus drive; `None` waits for the wheels forever
    pub maneuver_timeout: Option<Duration>,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            maneuver_timeout: Some(MANEUVER_TIMEOUT),
        }
    }
}

pub(super) struct MotionCore<A> {
    pub(super) issuer: MotorCommandIssuer<A>,
    pub(super) scratch: Scratch,
}

pub struct MotionSubsystem<A> {
    pub(super) core: Mutex<MotionCore<A>>,
    pub(super) phase: watch::Sender<TurnPhase>,
    pub(super) settings: MotionSettings,
}

impl<A: Actuator> MotionSubsystem<A> {
    pub fn new(actuator: A, settings: MotionSettings) -> Self {
        let (phase, _) = watch::channel(TurnPhase::Idle);
        Self {
            core: Mutex::new(MotionCore {
                issuer: MotorCommandIssuer::new(actuator),
                scratch: Scratch::default(),
            }),
            phase,
            settings,
        }
    }

    /// Whether a conversion or maneuver currently holds the lock
    pub fn is_busy(&self) -> bool {
        self.core.try_lock().is_err()
    }

    pub fn phase(&self) -> TurnPhase {
        *self.phase.borrow()
    }

    /// Receiver notified on every turn phase transition
    pub fn subscribe_phase(&self) -> watch::Receiver<TurnPhase> {
        self.phase.subscribe()
    }

    pub(super) fn set_phase(&self, phase: TurnPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            debug!("Turn phase {:?} -> {:?}", previous, phase);
        }
    }

    /// Copy of the scratch record, once the lock is free
    pub async fn scratch(&self) -> Scratch {
        self.core.lock().await.scratch
    }

    /// Stop the given motors, waiting for any running maneuver first
    pub async fn stop(&self, spec: PortSpec) -> Result<()> {
        let mut core = self.core.lock().await;
        core.issuer.stop(spec.resolve()).await
    }
}
