// Translates motion targets into actuator commands
//
// Every call returns as soon as the actuator has accepted the command; none
// of them waits for the wheels. Actuator round trips may block on a serial
// bus, so each one runs on the blocking pool and the calling task only
// awaits its completion.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use super::error::{MotionError, Result};
use crate::motor::{Actuator, ActuatorError, DriveCommand, OutputPort, PortList, MAX_POWER};

fn clamp_percent(value: i8, what: &str) -> i8 {
    let clamped = value.clamp(-MAX_POWER, MAX_POWER);
    if clamped != value {
        warn!("{} {} out of range, clamped to {}", what, value, clamped);
    }
    clamped
}

pub struct MotorCommandIssuer<A> {
    actuator: Arc<Mutex<A>>,
}

impl<A: Actuator> MotorCommandIssuer<A> {
    pub fn new(actuator: A) -> Self {
        Self {
            actuator: Arc::new(Mutex::new(actuator)),
        }
    }

    /// Rotate each port `target_degrees` at `power`
    pub async fn drive_single(&mut self, ports: PortList, power: i8, target_degrees: i32) -> Result<()> {
        if ports.is_empty() {
            return Err(MotionError::PortCount {
                expected: "1 to 3",
                got: 0,
            });
        }
        self.send(DriveCommand::Single {
            ports,
            power: clamp_percent(power, "Power"),
            target_degrees,
        })
        .await
    }

    /// Run exactly two ports at a fixed speed ratio given by `turn_bias`
    pub async fn drive_synchronized(&mut self, ports: PortList, power: i8, turn_bias: i8) -> Result<()> {
        let pair = ports.pair().ok_or(MotionError::PortCount {
            expected: "2",
            got: ports.len(),
        })?;
        self.send(DriveCommand::Synchronized {
            pair,
            power: clamp_percent(power, "Power"),
            turn_bias: clamp_percent(turn_bias, "Turn bias"),
        })
        .await
    }

    pub async fn stop(&mut self, ports: PortList) -> Result<()> {
        self.send(DriveCommand::Stop { ports }).await
    }

    pub async fn reset_rotation_count(&mut self, port: OutputPort) -> Result<()> {
        self.with_actuator(move |actuator| actuator.reset_rotation_count(port))
            .await
    }

    pub async fn rotation_count(&mut self, port: OutputPort) -> Result<i32> {
        self.with_actuator(move |actuator| actuator.rotation_count(port))
            .await
    }

    async fn send(&mut self, command: DriveCommand) -> Result<()> {
        debug!("Issuing {:?}", command);
        self.with_actuator(move |actuator| actuator.apply(&command))
            .await
    }

    /// Run one actuator call off the async executor. If the caller is dropped
    /// mid-call (e.g. on a maneuver timeout) the call still completes, and the
    /// next one waits for it.
    async fn with_actuator<T, F>(&self, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut A) -> std::result::Result<T, ActuatorError> + Send + 'static,
    {
        let actuator = Arc::clone(&self.actuator);
        let output = spawn_blocking(move || {
            let mut actuator = actuator.lock().unwrap_or_else(PoisonError::into_inner);
            call(&mut actuator)
        })
        .await?;
        Ok(output?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::PortSpec;
    use crate::sim::SimulatedActuator;

    #[tokio::test]
    async fn test_drive_synchronized_needs_a_pair() {
        let sim = SimulatedActuator::new();
        let mut issuer = MotorCommandIssuer::new(sim.clone());

        let err = issuer
            .drive_synchronized(PortSpec::ABC.resolve(), 50, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, MotionError::PortCount { got: 3, .. }));
        assert!(sim.commands().is_empty());

        issuer.drive_synchronized(PortSpec::AC.resolve(), 50, 100).await.unwrap();
        assert_eq!(
            sim.commands(),
            vec![DriveCommand::Synchronized {
                pair: [OutputPort::A, OutputPort::C],
                power: 50,
                turn_bias: 100,
            }]
        );
    }

    #[tokio::test]
    async fn test_power_is_clamped() {
        let sim = SimulatedActuator::new();
        let mut issuer = MotorCommandIssuer::new(sim.clone());

        issuer
            .drive_single(PortSpec::Single(OutputPort::B).resolve(), 120, 90)
            .await
            .unwrap();
        issuer
            .drive_synchronized(PortSpec::AB.resolve(), -128, -127)
            .await
            .unwrap();

        let commands = sim.commands();
        assert!(matches!(commands[0], DriveCommand::Single { power: 100, target_degrees: 90, .. }));
        assert!(matches!(
            commands[1],
            DriveCommand::Synchronized { power: -100, turn_bias: -100, .. }
        ));
    }

    #[tokio::test]
    async fn test_drive_single_rejects_empty_ports() {
        let sim = SimulatedActuator::new();
        let mut issuer = MotorCommandIssuer::new(sim.clone());
        assert!(issuer.drive_single(PortSpec::Set(0).resolve(), 50, 90).await.is_err());
        assert!(sim.commands().is_empty());
    }

    #[tokio::test]
    async fn test_stop_and_counters_are_forwarded() {
        let sim = SimulatedActuator::new();
        let mut issuer = MotorCommandIssuer::new(sim.clone());
        sim.script_reset_residues(OutputPort::C, [7]);

        issuer.reset_rotation_count(OutputPort::C).await.unwrap();
        assert_eq!(issuer.rotation_count(OutputPort::C).await.unwrap(), 7);
        issuer.stop(PortSpec::AC.resolve()).await.unwrap();
        assert_eq!(
            sim.commands(),
            vec![DriveCommand::Stop {
                ports: PortSpec::AC.resolve()
            }]
        );
    }
}
