// Fixed-rate loop bridging the message bus and the motion/surface subsystems
// Motion commands run one at a time on a worker task in arrival order; the loop
// itself never blocks on a maneuver, so surface and health keep publishing
// while the robot turns.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{
    GeometryConfig, RobotConfig, LOOP_HZ, TOPIC_CMD_MOTION, TOPIC_HEALTH, TOPIC_MOTION, TOPIC_SENSOR_RAW,
    TOPIC_SURFACE,
};
use crate::messages::{MotionCommand, MotionReport, RuntimeHealth, SensorSample, SurfaceReport};
use crate::motion::{MotionSettings, MotionSubsystem};
use crate::motor::{Actuator, FeetechActuator, FeetechError};
use crate::sim::SimulatedActuator;
use crate::surface::{LatestSample, MazeVariant, SurfaceObserver, SurfaceState};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Run one command against the subsystem and describe the outcome
async fn execute<A: Actuator>(
    motion: &MotionSubsystem<A>,
    geometry: &GeometryConfig,
    seq: u64,
    command: MotionCommand,
) -> MotionReport {
    let result = match command {
        MotionCommand::Turn { ports, power, degrees } => motion
            .rotate_base_degrees(
                ports,
                power,
                degrees,
                geometry.wheel_diameter_mm,
                geometry.track_width_mm,
            )
            .await
            .map(|target| Some(i64::from(target))),
        MotionCommand::DriveMm { ports, power, mm } => motion
            .rotate_motor_mm(ports, power, mm, geometry.wheel_circumference_mm)
            .await
            .map(|degrees| Some(i64::from(degrees))),
        MotionCommand::Stop { ports } => motion.stop(ports).await.map(|()| None),
    };

    match result {
        Ok(degrees) => MotionReport {
            seq,
            command,
            degrees,
            error: None,
        },
        Err(e) => {
            warn!("Motion command #{} failed: {}", seq, e);
            MotionReport {
                seq,
                command,
                degrees: None,
                error: Some(e.to_string()),
            }
        }
    }
}

pub struct Runtime<A> {
    motion: Arc<MotionSubsystem<A>>,
    maze: MazeVariant,
    surface: SurfaceState,
    classify_interval: Duration,
    sensor_tx: watch::Sender<Option<i32>>,
    cmd_tx: mpsc::UnboundedSender<(u64, MotionCommand)>,
    report_rx: mpsc::UnboundedReceiver<MotionReport>,
    worker: JoinHandle<()>,
    next_seq: u64,
    in_flight: usize,
    faulted: bool,
    health: RuntimeHealth,
}

impl<A: Actuator + 'static> Runtime<A> {
    /// Must be called from within a tokio runtime; the command worker is
    /// spawned immediately.
    pub fn new(actuator: A, config: &RobotConfig) -> Self {
        let settings = MotionSettings {
            poll_interval: config.poll_interval(),
            maneuver_timeout: config.maneuver_timeout(),
        };
        let motion = Arc::new(MotionSubsystem::new(actuator, settings));
        let (sensor_tx, _) = watch::channel(None);
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<(u64, MotionCommand)>();
        let (report_tx, report_rx) = mpsc::unbounded_channel();

        let worker = {
            let motion = Arc::clone(&motion);
            let geometry = config.geometry.clone();
            tokio::spawn(async move {
                while let Some((seq, command)) = cmd_rx.recv().await {
                    let report = execute(&motion, &geometry, seq, command).await;
                    if report_tx.send(report).is_err() {
                        break;
                    }
                }
            })
        };

        Self {
            motion,
            maze: config.maze,
            surface: SurfaceState::new(),
            classify_interval: config.classify_interval(),
            sensor_tx,
            cmd_tx,
            report_rx,
            worker,
            next_seq: 0,
            in_flight: 0,
            faulted: false,
            health: RuntimeHealth::Idle,
        }
    }

    pub fn motion(&self) -> &Arc<MotionSubsystem<A>> {
        &self.motion
    }

    pub fn surface(&self) -> &SurfaceState {
        &self.surface
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Start the surface observer on the sensor channel of the active maze
    pub fn spawn_observer(&self) -> JoinHandle<()> {
        let sensor = LatestSample::new(self.sensor_tx.subscribe());
        SurfaceObserver::new(sensor, self.maze.classifier(), self.surface.clone(), self.classify_interval).spawn()
    }

    /// Process incoming sensor sample
    pub fn on_sample(&mut self, sample: SensorSample) {
        if sample.channel == self.maze.sensor_channel() {
            self.sensor_tx.send_replace(Some(sample.value));
        } else {
            debug!("Ignoring {:?} sample in {:?} maze", sample.channel, self.maze);
        }
    }

    /// Queue an incoming command. Returns its sequence number.
    pub fn on_command(&mut self, command: MotionCommand) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        info!("Received command #{}: {:?}", seq, command);
        if self.cmd_tx.send((seq, command)).is_err() {
            warn!("Motion worker is gone, dropping command #{}", seq);
            return seq;
        }
        self.in_flight += 1;
        seq
    }

    /// Collect the reports of every command finished since the last call
    pub fn drain_reports(&mut self) -> Vec<MotionReport> {
        let mut reports = Vec::new();
        while let Ok(report) = self.report_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            self.faulted = !report.is_ok();
            reports.push(report);
        }
        reports
    }

    /// Health from the command backlog and the last finished command
    pub fn compute_health(&mut self) -> RuntimeHealth {
        let health = if self.worker.is_finished() {
            RuntimeHealth::Fault
        } else if self.in_flight > 0 {
            RuntimeHealth::Maneuvering
        } else if self.faulted {
            RuntimeHealth::Fault
        } else {
            RuntimeHealth::Idle
        };
        if health != self.health {
            info!("Health {:?} -> {:?}", self.health, health);
        }
        self.health = health;
        health
    }

    pub fn surface_report(&self) -> SurfaceReport {
        SurfaceReport {
            maze: self.maze,
            category: self.surface.current(),
        }
    }
}

impl<A> Drop for Runtime<A> {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Open the configured actuator backend and run until an error occurs
pub async fn run(config: RobotConfig, simulate: bool) -> Result<(), BoxError> {
    if simulate || !config.motor.enabled {
        info!("Using simulated motors");
        return run_with(SimulatedActuator::new(), config).await;
    }

    // Opening and pinging the bus blocks on serial I/O
    let (port, ids) = (config.motor.port.clone(), config.motor.ids);
    let actuator = tokio::task::spawn_blocking(move || {
        let mut actuator = FeetechActuator::with_motor_ids(&port, ids)?;
        actuator.initialize()?;
        Ok::<_, FeetechError>(actuator)
    })
    .await??;
    run_with(actuator, config).await
}

pub async fn run_with<A: Actuator + 'static>(actuator: A, config: RobotConfig) -> Result<(), BoxError> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_cmd = session.declare_subscriber(TOPIC_CMD_MOTION).await?;
    let sub_sensor = session.declare_subscriber(TOPIC_SENSOR_RAW).await?;
    let pub_surface = session.declare_publisher(TOPIC_SURFACE).await?;
    let pub_motion = session.declare_publisher(TOPIC_MOTION).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new(actuator, &config);
    let observer = runtime.spawn_observer();
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!("Runtime started: {}Hz loop, {:?} maze", LOOP_HZ, config.maze);
    info!("Subscribed to: {}, {}", TOPIC_CMD_MOTION, TOPIC_SENSOR_RAW);
    info!("Publishing to: {}, {}, {}", TOPIC_SURFACE, TOPIC_MOTION, TOPIC_HEALTH);

    let result: Result<(), BoxError> = async {
        loop {
            tick.tick().await;

            // 1. Drain sensor samples (non-blocking), the observer picks up the latest
            while let Ok(Some(sample)) = sub_sensor.try_recv() {
                let payload = sample.payload().to_bytes();
                match serde_json::from_slice::<SensorSample>(&payload) {
                    Ok(sample) => runtime.on_sample(sample),
                    Err(e) => warn!("Failed to parse sensor sample: {}", e),
                }
            }

            // 2. Drain all pending commands, queued in arrival order
            while let Ok(Some(sample)) = sub_cmd.try_recv() {
                let payload = sample.payload().to_bytes();
                match serde_json::from_slice::<MotionCommand>(&payload) {
                    Ok(command) => {
                        runtime.on_command(command);
                    }
                    Err(e) => warn!("Failed to parse command: {}", e),
                }
            }

            // 3. Publish finished maneuvers
            for report in runtime.drain_reports() {
                pub_motion.put(serde_json::to_string(&report)?).await?;
            }

            // 4. Publish surface and health
            pub_surface.put(serde_json::to_string(&runtime.surface_report())?).await?;
            let health = runtime.compute_health();
            pub_health.put(serde_json::to_string(&health)?).await?;
        }
    }
    .await;

    observer.abort();
    result
}
