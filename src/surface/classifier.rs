// Surface classification per maze type
//
// Maze types differ in background, line, junction and exit colors. The two
// older mazes are read with the reflected-light sensor (percent), the color
// maze with a color sensor returning a color number.

use serde::{Deserialize, Serialize};

use super::SurfaceCategory;

pub trait SurfaceClassifier: Send + Sync {
    fn classify(&self, reading: i32) -> SurfaceCategory;
}

/// Reflected-light calibration: typical readings on a junction and on a line,
/// and the margin allowed around them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightCalibration {
    pub delta: i32,
    pub junction: i32,
    pub line: i32,
}

/// Threshold classifier for light readings.
///
/// Below `junction + delta` is a junction. Above `line - delta` (and, when
/// the line is bounded, below `line + delta`) is a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightClassifier {
    junction_below: i32,
    line_above: i32,
    line_below: Option<i32>,
}

impl LightClassifier {
    /// White background, grey lines, black junctions. Anything brighter than
    /// the line is background, so the line band is bounded on both sides.
    pub fn white() -> Self {
        Self::bounded(LightCalibration {
            delta: 5,
            junction: 33,
            line: 50,
        })
    }

    /// Gray background, white lines, black junctions
    pub fn gray() -> Self {
        Self::open(LightCalibration {
            delta: 5,
            junction: 40,
            line: 67,
        })
    }

    pub fn bounded(cal: LightCalibration) -> Self {
        Self {
            line_below: Some(cal.line + cal.delta),
            ..Self::open(cal)
        }
    }

    pub fn open(cal: LightCalibration) -> Self {
        Self {
            junction_below: cal.junction + cal.delta,
            line_above: cal.line - cal.delta,
            line_below: None,
        }
    }
}

impl SurfaceClassifier for LightClassifier {
    fn classify(&self, light: i32) -> SurfaceCategory {
        if light < self.junction_below {
            SurfaceCategory::Junction
        } else if light > self.line_above && self.line_below.is_none_or(|upper| light < upper) {
            SurfaceCategory::Line
        } else {
            SurfaceCategory::Undefined
        }
    }
}

/// White background, black lines, red junctions, blue exit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorClassifier;

impl SurfaceClassifier for ColorClassifier {
    fn classify(&self, color: i32) -> SurfaceCategory {
        match color {
            0 => SurfaceCategory::Line,
            2 | 3 => SurfaceCategory::Exit,
            7..=10 => SurfaceCategory::Junction,
            _ => SurfaceCategory::Undefined,
        }
    }
}

/// Sensor a maze type is read with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorChannel {
    Light,
    Color,
}

/// Grid element sizes of a maze, in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MazeMetrics {
    pub junction_length: u32,
    pub junction_width: u32,
    pub line_length: u32,
    pub line_width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MazeVariant {
    /// Old-style maze with white background
    White,
    /// New-style maze with gray background
    Gray,
    /// Color maze
    Color,
}

impl MazeVariant {
    /// Variant compiled in as the default
    #[cfg(feature = "maze-white")]
    pub const BUILD: MazeVariant = MazeVariant::White;
    #[cfg(all(feature = "maze-gray", not(feature = "maze-white")))]
    pub const BUILD: MazeVariant = MazeVariant::Gray;
    #[cfg(not(any(feature = "maze-white", feature = "maze-gray")))]
    pub const BUILD: MazeVariant = MazeVariant::Color;

    pub fn classifier(self) -> Box<dyn SurfaceClassifier> {
        match self {
            MazeVariant::White => Box::new(LightClassifier::white()),
            MazeVariant::Gray => Box::new(LightClassifier::gray()),
            MazeVariant::Color => Box::new(ColorClassifier),
        }
    }

    pub fn sensor_channel(self) -> SensorChannel {
        match self {
            MazeVariant::White | MazeVariant::Gray => SensorChannel::Light,
            MazeVariant::Color => SensorChannel::Color,
        }
    }

    pub fn metrics(self) -> MazeMetrics {
        let (junction_length, junction_width, line_length, line_width) = match self {
            MazeVariant::White => (35, 35, 141, 17),
            MazeVariant::Gray => (27, 27, 113, 21),
            MazeVariant::Color => (30, 30, 110, 20),
        };
        MazeMetrics {
            junction_length,
            junction_width,
            line_length,
            line_width,
        }
    }
}

impl Default for MazeVariant {
    fn default() -> Self {
        Self::BUILD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SurfaceCategory::{Exit, Junction, Line, Undefined};

    #[test]
    fn test_color_table() {
        let classifier = ColorClassifier;
        for (code, expected) in [
            (0, Line),
            (1, Undefined),
            (2, Exit),
            (3, Exit),
            (4, Undefined),
            (6, Undefined),
            (7, Junction),
            (8, Junction),
            (9, Junction),
            (10, Junction),
            (11, Undefined),
            (17, Undefined),
            (-1, Undefined),
        ] {
            assert_eq!(classifier.classify(code), expected, "color {}", code);
        }
    }

    #[test]
    fn test_white_maze_thresholds() {
        let classifier = LightClassifier::white();
        assert_eq!(classifier.classify(20), Junction);
        assert_eq!(classifier.classify(37), Junction);
        assert_eq!(classifier.classify(38), Undefined);
        assert_eq!(classifier.classify(45), Undefined);
        assert_eq!(classifier.classify(46), Line);
        assert_eq!(classifier.classify(54), Line);
        // Background is brighter than the line
        assert_eq!(classifier.classify(55), Undefined);
        assert_eq!(classifier.classify(80), Undefined);
    }

    #[test]
    fn test_gray_maze_thresholds() {
        let classifier = LightClassifier::gray();
        assert_eq!(classifier.classify(44), Junction);
        assert_eq!(classifier.classify(45), Undefined);
        assert_eq!(classifier.classify(62), Undefined);
        assert_eq!(classifier.classify(63), Line);
        assert_eq!(classifier.classify(100), Line);
    }

    #[test]
    fn test_light_mazes_never_report_exit() {
        for variant in [MazeVariant::White, MazeVariant::Gray] {
            let classifier = variant.classifier();
            assert!((0..=100).all(|light| classifier.classify(light) != Exit));
        }
    }

    #[test]
    fn test_variant_selection() {
        assert_eq!(MazeVariant::Color.classifier().classify(2), Exit);
        assert_eq!(MazeVariant::Gray.sensor_channel(), SensorChannel::Light);
        assert_eq!(MazeVariant::Color.sensor_channel(), SensorChannel::Color);
        assert_eq!(MazeVariant::White.metrics().line_length, 141);
        assert_eq!(MazeVariant::default(), MazeVariant::BUILD);
    }
}
