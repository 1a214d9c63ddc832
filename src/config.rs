// Robot constants, topics, and the runtime configuration file
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::motor::{PortSpec, DEFAULT_MOTOR_IDS};
use crate::surface::MazeVariant;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Zenoh topics
pub const TOPIC_CMD_MOTION: &str = "maze/cmd/motion"; // motion commands
pub const TOPIC_SENSOR_RAW: &str = "maze/sensor/raw"; // raw sensor samples
pub const TOPIC_SURFACE: &str = "maze/state/surface"; // classified surface
pub const TOPIC_MOTION: &str = "maze/state/motion"; // maneuver results
pub const TOPIC_HEALTH: &str = "maze/state/health"; // health status

// Serial port for the Feetech motor chain
pub const MOTOR_PORT: &str = "/dev/ttyUSB0";

// Enable hardware motor control (set to false for simulation/testing)
pub const MOTOR_ENABLED: bool = true;

// Drive wheels: left on A, right on C
pub const MOTOR_BOTH: PortSpec = PortSpec::AC;

// Default drive power (percent)
pub const SPEED_MEDIUM: i8 = 50;

// Geometry (mm)
pub const WHEEL_DIAMETER: u32 = 56;
pub const WHEEL_CIRCUMFERENCE: u32 = 176;
pub const TRACK_WIDTH: u32 = 115; // center-to-center wheel distance

// Motion timing
pub const POLL_INTERVAL: Duration = Duration::from_millis(2);
pub const MANEUVER_TIMEOUT: Duration = Duration::from_secs(10);

// Surface sampling period
pub const CLASSIFY_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub wheel_diameter_mm: u32,
    pub wheel_circumference_mm: u32,
    pub track_width_mm: u32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            wheel_diameter_mm: WHEEL_DIAMETER,
            wheel_circumference_mm: WHEEL_CIRCUMFERENCE,
            track_width_mm: TRACK_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub poll_interval_ms: u64,
    /// 0 disables the timeout
    pub maneuver_timeout_ms: u64,
    pub classify_interval_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL.as_millis() as u64,
            maneuver_timeout_ms: MANEUVER_TIMEOUT.as_millis() as u64,
            classify_interval_ms: CLASSIFY_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    pub enabled: bool,
    pub port: String,
    /// Servo IDs on ports A, B, C
    pub ids: [u8; 3],
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            enabled: MOTOR_ENABLED,
            port: MOTOR_PORT.to_string(),
            ids: DEFAULT_MOTOR_IDS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub maze: MazeVariant,
    pub geometry: GeometryConfig,
    pub motion: MotionConfig,
    pub motor: MotorConfig,
}

impl RobotConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let geometry = &self.geometry;
        for (name, value) in [
            ("wheel_diameter_mm", geometry.wheel_diameter_mm),
            ("wheel_circumference_mm", geometry.wheel_circumference_mm),
            ("track_width_mm", geometry.track_width_mm),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("geometry.{} must be non-zero", name)));
            }
        }
        if self.motion.poll_interval_ms == 0 || self.motion.classify_interval_ms == 0 {
            return Err(ConfigError::Invalid("motion intervals must be non-zero".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.motion.poll_interval_ms)
    }

    pub fn maneuver_timeout(&self) -> Option<Duration> {
        match self.motion.maneuver_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn classify_interval(&self) -> Duration {
        Duration::from_millis(self.motion.classify_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_robot_defaults() {
        let config = RobotConfig::from_toml("").unwrap();
        assert_eq!(config, RobotConfig::default());
        assert_eq!(config.geometry.wheel_diameter_mm, 56);
        assert_eq!(config.geometry.track_width_mm, 115);
        assert_eq!(config.maze, MazeVariant::BUILD);
        assert_eq!(config.maneuver_timeout(), Some(MANEUVER_TIMEOUT));
    }

    #[test]
    fn test_partial_override() {
        let config = RobotConfig::from_toml(
            r#"
            maze = "gray"

            [geometry]
            track_width_mm = 120

            [motion]
            maneuver_timeout_ms = 0

            [motor]
            enabled = false
            ids = [1, 2, 3]
            "#,
        )
        .unwrap();
        assert_eq!(config.maze, MazeVariant::Gray);
        assert_eq!(config.geometry.track_width_mm, 120);
        assert_eq!(config.geometry.wheel_diameter_mm, WHEEL_DIAMETER);
        assert_eq!(config.maneuver_timeout(), None);
        assert!(!config.motor.enabled);
        assert_eq!(config.motor.ids, [1, 2, 3]);
    }

    #[test]
    fn test_zero_geometry_rejected() {
        let err = RobotConfig::from_toml("[geometry]\nwheel_diameter_mm = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(matches!(
            RobotConfig::from_toml("maze = \"hexagonal\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
