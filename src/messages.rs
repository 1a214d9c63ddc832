// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::config::{MOTOR_BOTH, SPEED_MEDIUM};
use crate::motor::PortSpec;
use crate::surface::{MazeVariant, SensorChannel, SurfaceCategory};

fn drive_ports() -> PortSpec {
    MOTOR_BOTH
}

fn drive_power() -> i8 {
    SPEED_MEDIUM
}

// Command from the maze traversal / scripts -> runtime
// Ports default to both drive wheels, power to the medium speed preset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionCommand {
    /// Turn the base in place
    Turn {
        #[serde(default = "drive_ports")]
        ports: PortSpec,
        #[serde(default = "drive_power")]
        power: i8,
        degrees: i32,
    },
    /// Roll the wheels forward (negative: backward)
    DriveMm {
        #[serde(default = "drive_ports")]
        ports: PortSpec,
        #[serde(default = "drive_power")]
        power: i8,
        mm: i32,
    },
    Stop {
        #[serde(default = "drive_ports")]
        ports: PortSpec,
    },
}

// Raw sensor reading from the sensor board -> runtime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub channel: SensorChannel,
    pub value: i32,
}

/// Classified surface published by runtime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceReport {
    pub maze: MazeVariant,
    pub category: SurfaceCategory,
}

/// Result of one motion command, published once it finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionReport {
    /// Position of the command in the order it was received
    pub seq: u64,
    pub command: MotionCommand,
    /// Wheel degrees driven, for turns and drives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degrees: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MotionReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Idle,
    Maneuvering,
    Fault,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::OutputPort;

    #[test]
    fn test_parse_motion_commands() {
        let turn: MotionCommand =
            serde_json::from_str(r#"{"kind":"turn","ports":"ac","power":50,"degrees":-90}"#).unwrap();
        assert_eq!(
            turn,
            MotionCommand::Turn {
                ports: PortSpec::AC,
                power: 50,
                degrees: -90
            }
        );

        let drive: MotionCommand =
            serde_json::from_str(r#"{"kind":"drive_mm","ports":{"single":"c"},"power":30,"mm":120}"#).unwrap();
        assert_eq!(
            drive,
            MotionCommand::DriveMm {
                ports: PortSpec::Single(OutputPort::C),
                power: 30,
                mm: 120
            }
        );

        let stop: MotionCommand = serde_json::from_str(r#"{"kind":"stop","ports":"abc"}"#).unwrap();
        assert_eq!(stop, MotionCommand::Stop { ports: PortSpec::ABC });

        assert!(serde_json::from_str::<MotionCommand>(r#"{"kind":"spin"}"#).is_err());
    }

    #[test]
    fn test_missing_ports_and_power_use_drive_defaults() {
        let turn: MotionCommand = serde_json::from_str(r#"{"kind":"turn","degrees":90}"#).unwrap();
        assert_eq!(
            turn,
            MotionCommand::Turn {
                ports: PortSpec::AC,
                power: 50,
                degrees: 90
            }
        );
        let stop: MotionCommand = serde_json::from_str(r#"{"kind":"stop"}"#).unwrap();
        assert_eq!(stop, MotionCommand::Stop { ports: PortSpec::AC });
    }

    #[test]
    fn test_report_omits_empty_fields() {
        let report = MotionReport {
            seq: 3,
            command: MotionCommand::Stop { ports: PortSpec::AC },
            degrees: None,
            error: None,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"seq":3,"command":{"kind":"stop","ports":"ac"}}"#);
        assert!(report.is_ok());
    }

    #[test]
    fn test_sensor_sample_and_health_wire_format() {
        let sample: SensorSample = serde_json::from_str(r#"{"channel":"light","value":48}"#).unwrap();
        assert_eq!(sample.channel, SensorChannel::Light);
        assert_eq!(sample.value, 48);
        assert_eq!(serde_json::to_string(&RuntimeHealth::Maneuvering).unwrap(), r#""maneuvering""#);
    }
}
