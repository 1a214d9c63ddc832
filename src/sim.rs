// Simulated hardware for tests and `--simulate` runs
//
// SimulatedActuator advances a port's rotation counter each time the counter
// is read while the port is powered, so maneuvers run without wall clock
// time. Wheels can be slowed, stalled, or given scripted counter noise after
// a reset. Clones share one state so a test can keep a handle while the
// motion subsystem owns the actuator.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::motor::{sync_powers, Actuator, ActuatorError, DriveCommand, OutputPort};
use crate::surface::{Sensor, SensorError};

/// Counter advance per read at any non-zero power, in degrees
pub const DEFAULT_SIM_SPEED: i32 = 10;

#[derive(Debug, Clone)]
struct SimMotor {
    power: i8,
    count: i32,
    speed: i32,
    stalled: bool,
    /// Degrees left before a single targeted move stops the motor
    remaining: Option<u32>,
    reset_residues: VecDeque<i32>,
    resets: usize,
}

impl Default for SimMotor {
    fn default() -> Self {
        Self {
            power: 0,
            count: 0,
            speed: DEFAULT_SIM_SPEED,
            stalled: false,
            remaining: None,
            reset_residues: VecDeque::new(),
            resets: 0,
        }
    }
}

impl SimMotor {
    fn advance(&mut self) {
        if self.power == 0 || self.stalled {
            return;
        }
        let direction = i32::from(self.power.signum());
        let mut step = self.speed.unsigned_abs();
        if let Some(remaining) = self.remaining.as_mut() {
            step = step.min(*remaining);
            *remaining -= step;
            if *remaining == 0 {
                self.power = 0;
                self.remaining = None;
            }
        }
        self.count += step as i32 * direction;
    }
}

#[derive(Debug, Default)]
struct SimState {
    motors: [SimMotor; 3],
    commands: Vec<DriveCommand>,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedActuator {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Degrees a port's counter moves per read while powered; the sign of the
    /// applied power gives the direction
    pub fn set_speed(&self, port: OutputPort, degrees_per_read: i32) {
        self.state().motors[port.index()].speed = degrees_per_read;
    }

    /// A stalled wheel keeps its counter no matter the power applied
    pub fn set_stalled(&self, port: OutputPort, stalled: bool) {
        self.state().motors[port.index()].stalled = stalled;
    }

    /// Values the counter reads right after each of the next resets
    pub fn script_reset_residues(&self, port: OutputPort, residues: impl IntoIterator<Item = i32>) {
        self.state().motors[port.index()].reset_residues.extend(residues);
    }

    pub fn commands(&self) -> Vec<DriveCommand> {
        self.state().commands.clone()
    }

    /// Counter value without advancing the simulation
    pub fn peek_rotation(&self, port: OutputPort) -> i32 {
        self.state().motors[port.index()].count
    }

    pub fn power(&self, port: OutputPort) -> i8 {
        self.state().motors[port.index()].power
    }

    pub fn reset_count(&self, port: OutputPort) -> usize {
        self.state().motors[port.index()].resets
    }
}

impl Actuator for SimulatedActuator {
    fn apply(&mut self, command: &DriveCommand) -> Result<(), ActuatorError> {
        let mut state = self.state();
        match *command {
            DriveCommand::Single {
                ports,
                power,
                target_degrees,
            } => {
                let power = if target_degrees < 0 { power.saturating_neg() } else { power };
                for &port in ports.as_slice() {
                    let motor = &mut state.motors[port.index()];
                    let remaining = target_degrees.unsigned_abs();
                    motor.power = if remaining == 0 { 0 } else { power };
                    motor.remaining = Some(remaining);
                }
            }
            DriveCommand::Synchronized {
                pair,
                power,
                turn_bias,
            } => {
                for (port, power) in pair.into_iter().zip(sync_powers(power, turn_bias)) {
                    let motor = &mut state.motors[port.index()];
                    motor.power = power;
                    motor.remaining = None;
                }
            }
            DriveCommand::Stop { ports } => {
                for &port in ports.as_slice() {
                    let motor = &mut state.motors[port.index()];
                    motor.power = 0;
                    motor.remaining = None;
                }
            }
        }
        state.commands.push(*command);
        Ok(())
    }

    fn reset_rotation_count(&mut self, port: OutputPort) -> Result<(), ActuatorError> {
        let mut state = self.state();
        let motor = &mut state.motors[port.index()];
        motor.count = motor.reset_residues.pop_front().unwrap_or(0);
        motor.resets += 1;
        Ok(())
    }

    fn rotation_count(&mut self, port: OutputPort) -> Result<i32, ActuatorError> {
        let mut state = self.state();
        let motor = &mut state.motors[port.index()];
        motor.advance();
        Ok(motor.count)
    }
}

/// Sensor replaying a fixed list of samples in a loop. `None` entries read as
/// a sensor fault.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    samples: VecDeque<Option<i32>>,
}

impl ScriptedSensor {
    pub fn new(readings: impl IntoIterator<Item = i32>) -> Self {
        Self::from_samples(readings.into_iter().map(Some))
    }

    pub fn from_samples(samples: impl IntoIterator<Item = Option<i32>>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }
}

impl Sensor for ScriptedSensor {
    fn read(&mut self) -> Result<i32, SensorError> {
        let sample = self.samples.pop_front().ok_or(SensorError::NoSample)?;
        self.samples.push_back(sample);
        sample.ok_or(SensorError::Fault("scripted fault".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::PortSpec;

    #[test]
    fn test_counter_only_moves_while_powered() {
        let mut sim = SimulatedActuator::new();
        assert_eq!(sim.rotation_count(OutputPort::A).unwrap(), 0);

        sim.apply(&DriveCommand::Synchronized {
            pair: [OutputPort::A, OutputPort::C],
            power: 50,
            turn_bias: 100,
        })
        .unwrap();
        assert_eq!(sim.rotation_count(OutputPort::A).unwrap(), 10);
        assert_eq!(sim.rotation_count(OutputPort::C).unwrap(), -10);

        sim.apply(&DriveCommand::Stop {
            ports: PortSpec::AC.resolve(),
        })
        .unwrap();
        assert_eq!(sim.rotation_count(OutputPort::A).unwrap(), 10);
    }

    #[test]
    fn test_single_move_stops_on_target() {
        let mut sim = SimulatedActuator::new();
        sim.set_speed(OutputPort::B, 40);
        sim.apply(&DriveCommand::Single {
            ports: PortSpec::Single(OutputPort::B).resolve(),
            power: 30,
            target_degrees: -100,
        })
        .unwrap();

        for _ in 0..5 {
            sim.rotation_count(OutputPort::B).unwrap();
        }
        assert_eq!(sim.peek_rotation(OutputPort::B), -100);
        assert_eq!(sim.power(OutputPort::B), 0);
    }

    #[test]
    fn test_reset_residues_then_zero() {
        let mut sim = SimulatedActuator::new();
        sim.script_reset_residues(OutputPort::A, [3, -2]);
        sim.reset_rotation_count(OutputPort::A).unwrap();
        assert_eq!(sim.rotation_count(OutputPort::A).unwrap(), 3);
        sim.reset_rotation_count(OutputPort::A).unwrap();
        assert_eq!(sim.rotation_count(OutputPort::A).unwrap(), -2);
        sim.reset_rotation_count(OutputPort::A).unwrap();
        assert_eq!(sim.rotation_count(OutputPort::A).unwrap(), 0);
        assert_eq!(sim.reset_count(OutputPort::A), 3);
    }

    #[test]
    fn test_scripted_sensor_cycles() {
        let mut sensor = ScriptedSensor::from_samples([Some(1), None, Some(3)]);
        assert_eq!(sensor.read().unwrap(), 1);
        assert!(sensor.read().is_err());
        assert_eq!(sensor.read().unwrap(), 3);
        assert_eq!(sensor.read().unwrap(), 1);
    }
}
