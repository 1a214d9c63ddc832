// Actuator backend over a chain of Feetech servos
//
// Ports A, B and C map onto servo IDs. Synchronized drive and stop run in
// velocity mode; single targeted moves use step mode, where GoalPosition is a
// relative step count. The servos only report a single-turn position, so the
// rotation counters are accumulated here from successive position reads.

use tracing::{debug, info, warn};

use super::actuator::{sync_powers, Actuator, ActuatorError, DriveCommand, MAX_POWER};
use super::feetech::{FeetechBus, FeetechError, OperatingMode, Register, STEPS_PER_REVOLUTION};
use super::port::{OutputPort, PortList};

/// Servo IDs wired to ports A, B, C
pub const DEFAULT_MOTOR_IDS: [u8; 3] = [7, 8, 9];

/// Raw goal velocity at 100 % power
pub const MAX_RAW_VELOCITY: i16 = 3000;

const HALF_TURN: i64 = STEPS_PER_REVOLUTION / 2;

/// Multi-turn step counter built from single-turn position samples
#[derive(Debug, Clone, Copy, Default)]
struct Odometer {
    last_raw: Option<u16>,
    steps: i64,
    zero: i64,
}

impl Odometer {
    /// Fold in a new sample, taking the shorter way around the dial. Samples
    /// must arrive at least every half revolution.
    fn update(&mut self, raw: u16) {
        if let Some(last) = self.last_raw {
            let mut delta = i64::from(raw) - i64::from(last);
            if delta > HALF_TURN {
                delta -= STEPS_PER_REVOLUTION;
            } else if delta < -HALF_TURN {
                delta += STEPS_PER_REVOLUTION;
            }
            self.steps += delta;
        }
        self.last_raw = Some(raw);
    }

    fn reset(&mut self) {
        self.zero = self.steps;
    }

    fn degrees(&self) -> i32 {
        ((self.steps - self.zero) * 360 / STEPS_PER_REVOLUTION) as i32
    }
}

fn power_to_velocity(power: i8) -> i16 {
    let power = i32::from(power).clamp(-i32::from(MAX_POWER), i32::from(MAX_POWER));
    (power * i32::from(MAX_RAW_VELOCITY) / i32::from(MAX_POWER)) as i16
}

fn degrees_to_steps(degrees: i32) -> i16 {
    let steps = i64::from(degrees) * STEPS_PER_REVOLUTION / 360;
    steps.clamp(-0x7FFF, 0x7FFF) as i16
}

pub struct FeetechActuator {
    bus: FeetechBus,
    motor_ids: [u8; 3],
    mode: OperatingMode,
    odometers: [Odometer; 3],
}

impl FeetechActuator {
    pub fn with_motor_ids(port: &str, motor_ids: [u8; 3]) -> Result<Self, FeetechError> {
        info!("Opening motor bus on {}", port);
        let bus = FeetechBus::open(port)?;
        Ok(Self {
            bus,
            motor_ids,
            mode: OperatingMode::Velocity,
            odometers: Default::default(),
        })
    }

    /// Check every servo answers, then put them all in velocity mode
    pub fn initialize(&mut self) -> Result<(), FeetechError> {
        info!("Initializing motors {:?}", self.motor_ids);
        for &id in &self.motor_ids {
            if !self.bus.ping(id)? {
                warn!("Motor {} not responding to ping", id);
                return Err(FeetechError::Timeout { id });
            }
            debug!("Motor {} responding", id);
        }
        for &id in &self.motor_ids {
            self.bus.set_operating_mode(id, OperatingMode::Velocity)?;
        }
        self.mode = OperatingMode::Velocity;
        for port in OutputPort::ALL {
            self.sample(port)?;
        }
        info!("Motors initialized");
        Ok(())
    }

    fn id(&self, port: OutputPort) -> u8 {
        self.motor_ids[port.index()]
    }

    fn ensure_mode(&mut self, mode: OperatingMode) -> Result<(), FeetechError> {
        if self.mode != mode {
            debug!("Switching motors to {:?} mode", mode);
            for &id in &self.motor_ids {
                self.bus.set_operating_mode(id, mode)?;
            }
            self.mode = mode;
        }
        Ok(())
    }

    fn sample(&mut self, port: OutputPort) -> Result<(), FeetechError> {
        let raw = self.bus.present_position(self.id(port))?;
        self.odometers[port.index()].update(raw);
        Ok(())
    }

    fn set_velocities(&mut self, targets: &[(OutputPort, i8)]) -> Result<(), FeetechError> {
        self.ensure_mode(OperatingMode::Velocity)?;
        let data: Vec<(u8, i16)> = targets
            .iter()
            .map(|&(port, power)| (self.id(port), power_to_velocity(power)))
            .collect();
        self.bus.sync_write_i16(Register::GoalVelocity, &data)
    }

    fn step(&mut self, ports: PortList, power: i8, target_degrees: i32) -> Result<(), FeetechError> {
        self.ensure_mode(OperatingMode::Step)?;
        let speed = power_to_velocity(power).abs();
        let direction = if (power < 0) != (target_degrees < 0) { -1 } else { 1 };
        let steps = degrees_to_steps(target_degrees.saturating_abs()) * direction;
        for &port in ports.as_slice() {
            let id = self.id(port);
            self.bus.write_i16(id, Register::GoalVelocity, speed)?;
            self.bus.write_i16(id, Register::GoalPosition, steps)?;
        }
        Ok(())
    }
}

impl Actuator for FeetechActuator {
    fn apply(&mut self, command: &DriveCommand) -> Result<(), ActuatorError> {
        debug!("Feetech command: {:?}", command);
        match *command {
            DriveCommand::Single {
                ports,
                power,
                target_degrees,
            } => self.step(ports, power, target_degrees)?,
            DriveCommand::Synchronized {
                pair,
                power,
                turn_bias,
            } => {
                let [first, second] = sync_powers(power, turn_bias);
                self.set_velocities(&[(pair[0], first), (pair[1], second)])?;
            }
            DriveCommand::Stop { ports } => {
                let zeros: Vec<(OutputPort, i8)> = ports.as_slice().iter().map(|&p| (p, 0)).collect();
                self.set_velocities(&zeros)?;
            }
        }
        Ok(())
    }

    fn reset_rotation_count(&mut self, port: OutputPort) -> Result<(), ActuatorError> {
        self.sample(port)?;
        self.odometers[port.index()].reset();
        Ok(())
    }

    fn rotation_count(&mut self, port: OutputPort) -> Result<i32, ActuatorError> {
        self.sample(port)?;
        Ok(self.odometers[port.index()].degrees())
    }
}

impl Drop for FeetechActuator {
    fn drop(&mut self) {
        let all: Vec<(OutputPort, i8)> = OutputPort::ALL.iter().map(|&p| (p, 0)).collect();
        if let Err(e) = self.set_velocities(&all) {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odometer_unwraps_across_zero() {
        let mut odo = Odometer::default();
        odo.update(4000);
        odo.update(50); // forward through 4095 -> 0
        assert_eq!(odo.steps, 146);
        odo.update(4000); // and back again
        assert_eq!(odo.steps, 0);
    }

    #[test]
    fn test_odometer_counts_multiple_turns() {
        let mut odo = Odometer::default();
        for raw in [0u16, 1024, 2048, 3072, 0, 1024, 2048, 3072, 0] {
            odo.update(raw);
        }
        assert_eq!(odo.degrees(), 720);

        odo.reset();
        assert_eq!(odo.degrees(), 0);
        odo.update(3072); // a quarter turn backwards
        assert_eq!(odo.degrees(), -90);
    }

    #[test]
    fn test_power_and_step_scaling() {
        assert_eq!(power_to_velocity(100), MAX_RAW_VELOCITY);
        assert_eq!(power_to_velocity(-50), -1500);
        assert_eq!(power_to_velocity(i8::MIN), -MAX_RAW_VELOCITY);
        assert_eq!(degrees_to_steps(360), 4096);
        assert_eq!(degrees_to_steps(-90), -1024);
        assert_eq!(degrees_to_steps(i32::MAX), 0x7FFF);
    }
}
