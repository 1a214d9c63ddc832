use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{Sensor, SensorError, SurfaceCategory, SurfaceClassifier, SurfaceState};

/// Samples one sensor channel forever and publishes what it sees
pub struct SurfaceObserver<S> {
    sensor: S,
    classifier: Box<dyn SurfaceClassifier>,
    state: SurfaceState,
    period: Duration,
}

impl<S: Sensor + 'static> SurfaceObserver<S> {
    pub fn new(
        sensor: S,
        classifier: Box<dyn SurfaceClassifier>,
        state: SurfaceState,
        period: Duration,
    ) -> Self {
        Self {
            sensor,
            classifier,
            state,
            period,
        }
    }

    /// Take one sample and publish its category. On a sensor fault the
    /// previous category stays published.
    pub fn observe_once(&mut self) -> Option<SurfaceCategory> {
        match self.sensor.read() {
            Ok(reading) => {
                let category = self.classifier.classify(reading);
                if category != self.state.current() {
                    debug!("Surface {:?} (reading {})", category, reading);
                }
                self.state.publish(category);
                Some(category)
            }
            Err(SensorError::NoSample) => {
                debug!("No surface sample yet");
                None
            }
            Err(e) => {
                warn!("Surface sample failed: {}", e);
                None
            }
        }
    }

    /// Observe until the task is aborted
    pub async fn run(mut self) {
        info!("Surface observer started, {}ms period", self.period.as_millis());
        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            self.observe_once();
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ScriptedSensor;
    use crate::surface::{ColorClassifier, LightClassifier};

    #[test]
    fn test_fault_keeps_previous_category() {
        let state = SurfaceState::new();
        let sensor = ScriptedSensor::from_samples([Some(8), None, Some(0)]);
        let mut observer =
            SurfaceObserver::new(sensor, Box::new(ColorClassifier), state.clone(), Duration::from_millis(10));

        assert_eq!(observer.observe_once(), Some(SurfaceCategory::Junction));
        assert_eq!(observer.observe_once(), None);
        assert_eq!(state.current(), SurfaceCategory::Junction);
        assert_eq!(observer.observe_once(), Some(SurfaceCategory::Line));
        assert_eq!(state.current(), SurfaceCategory::Line);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_task_keeps_publishing() {
        let state = SurfaceState::new();
        // Line, junction, background, repeating
        let sensor = ScriptedSensor::new([70, 30, 50]);
        let handle =
            SurfaceObserver::new(sensor, Box::new(LightClassifier::gray()), state.clone(), Duration::from_millis(10))
                .spawn();

        // First tick fires immediately
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(state.current(), SurfaceCategory::Line);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(state.current(), SurfaceCategory::Junction);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(state.current(), SurfaceCategory::Undefined);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(state.current(), SurfaceCategory::Line);

        assert!(!handle.is_finished());
        handle.abort();
    }
}
