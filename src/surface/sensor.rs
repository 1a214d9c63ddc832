use tokio::sync::watch;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SensorError {
    #[error("No sample received yet")]
    NoSample,

    #[error("Sensor fault: {0}")]
    Fault(String),
}

/// One readable sensor channel. Reads return the latest sample immediately.
pub trait Sensor: Send {
    fn read(&mut self) -> Result<i32, SensorError>;
}

/// Sensor fed from a watch channel, e.g. by the message bus listener
#[derive(Debug, Clone)]
pub struct LatestSample {
    rx: watch::Receiver<Option<i32>>,
}

impl LatestSample {
    pub fn new(rx: watch::Receiver<Option<i32>>) -> Self {
        Self { rx }
    }

    /// Sender and sensor pair with no sample yet
    pub fn channel() -> (watch::Sender<Option<i32>>, Self) {
        let (tx, rx) = watch::channel(None);
        (tx, Self::new(rx))
    }
}

impl Sensor for LatestSample {
    fn read(&mut self) -> Result<i32, SensorError> {
        (*self.rx.borrow()).ok_or(SensorError::NoSample)
    }
}
