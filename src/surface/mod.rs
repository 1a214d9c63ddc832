// Surface observation
//
// Provides:
// - The surface categories and the shared state they are published to
// - Per-maze classification strategies
// - The sensor seam and the observer task tying them together

mod classifier;
mod observer;
mod sensor;

pub use classifier::{
    ColorClassifier, LightCalibration, LightClassifier, MazeMetrics, MazeVariant, SensorChannel,
    SurfaceClassifier,
};
pub use observer::SurfaceObserver;
pub use sensor::{LatestSample, Sensor, SensorError};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// What the downward-facing sensor currently sees
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceCategory {
    Line = 0x01,
    Junction = 0x02,
    Exit = 0x03,
    Undefined = 0x04,
}

impl SurfaceCategory {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(SurfaceCategory::Line),
            0x02 => Some(SurfaceCategory::Junction),
            0x03 => Some(SurfaceCategory::Exit),
            0x04 => Some(SurfaceCategory::Undefined),
            _ => None,
        }
    }
}

/// Latest surface category, shared between the observer and its readers.
///
/// Written by exactly one observer and read without synchronization; a reader
/// may see a value one classification interval old.
#[derive(Debug, Clone)]
pub struct SurfaceState(Arc<AtomicU8>);

impl SurfaceState {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(SurfaceCategory::Undefined as u8)))
    }

    pub fn publish(&self, category: SurfaceCategory) {
        self.0.store(category as u8, Ordering::Relaxed);
    }

    pub fn current(&self) -> SurfaceCategory {
        SurfaceCategory::from_code(self.0.load(Ordering::Relaxed)).unwrap_or(SurfaceCategory::Undefined)
    }
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_starts_undefined_and_is_shared() {
        let state = SurfaceState::new();
        let reader = state.clone();
        assert_eq!(reader.current(), SurfaceCategory::Undefined);

        state.publish(SurfaceCategory::Junction);
        assert_eq!(reader.current(), SurfaceCategory::Junction);
    }

    #[test]
    fn test_category_codes() {
        for category in [
            SurfaceCategory::Line,
            SurfaceCategory::Junction,
            SurfaceCategory::Exit,
            SurfaceCategory::Undefined,
        ] {
            assert_eq!(SurfaceCategory::from_code(category as u8), Some(category));
        }
        assert_eq!(SurfaceCategory::from_code(0), None);
    }
}
