//! Session orchestrator - wires sensor, tracker, capture, coordinator and display.
//!
//! Start order is tracker first, then the coordinator; shutdown runs in reverse
//! so the coordinator never sees the orientation cell disappear on a clean stop.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{RigConfig, SessionClock};
use coordinator::{Coordinator, CoordinatorConfig, PipelineStats, StageState};
use ingestion::{create_frame_source, create_imu_source, BackpressureConfig, IngestionPipeline};
use tracing::{info, warn};
use tracking::TrackerWorker;

use crate::error::CliError;

/// How often the session loop checks limits
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Validated rig configuration
    pub rig: RigConfig,

    /// Stop after this many presented frames (None = unlimited)
    pub max_frames: Option<u64>,

    /// Run time limit (None = no limit)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One viewing session
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until a limit is hit, `shutdown` resolves or a fatal error stops the pipeline
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let rig = &self.config.rig;
        let clock = SessionClock::start();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Sensor transport -> tracker
        info!(kind = ?rig.sensor.kind, source = %rig.sensor.source_id, "Setting up sensor transport...");
        let mut ingestion = IngestionPipeline::with_config(BackpressureConfig::from(&rig.sensor));
        let imu = create_imu_source(&rig.sensor, clock, ingestion.metrics())
            .context("Failed to create IMU source")?;
        ingestion
            .register_source(imu, None)
            .context("Failed to register IMU source")?;
        let imu_rx = ingestion
            .take_receiver()
            .context("Ingestion receiver already taken")?;

        let tracker = TrackerWorker::spawn(rig.sensor.source_id.clone(), rig.filter, imu_rx);
        ingestion
            .start_all()
            .context("Failed to start sensor transport")?;
        info!(sources = ingestion.source_count(), "Tracker started");

        // Capture -> coordinator -> display
        let source =
            create_frame_source(&rig.capture, clock).context("Failed to create capture source")?;
        let display =
            display::create_display(&rig.display).context("Failed to create display")?;

        let coordinator_config = CoordinatorConfig {
            settings: rig.pipeline,
            eye: rig.eye,
            layout: rig.display.layout,
        };
        let mut handle = Coordinator::new(coordinator_config, source, display, tracker.reader(), clock)
            .spawn()
            .map_err(CliError::Config)?;

        info!(max_frames = ?self.config.max_frames, timeout = ?self.config.timeout, "Pipeline running");

        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    break;
                }
                _ = ticker.tick() => {
                    if handle.state() == StageState::Stopped {
                        break;
                    }
                    if let Some(max) = self.config.max_frames {
                        let presented = handle.stats().frames_presented;
                        if presented >= max {
                            info!(frames = presented, "Reached max frames limit");
                            break;
                        }
                    }
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        info!("Run time limit reached");
                        break;
                    }
                }
            }
        }

        info!("Shutting down pipeline...");
        let outcome = handle.shutdown().await;

        let tracker_failure = match tracker.stop().await {
            Ok(report) => {
                info!(
                    accepted = report.stats.accepted,
                    rejected = report.stats.rejected(),
                    "Tracker stopped"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "Tracker ended with error");
                // Sensor loss already surfaces through the pipeline outcome
                (!e.is_fatal()).then_some(e)
            }
        };
        ingestion.close();

        let metrics = ingestion.metrics().snapshot();
        info!(
            received = metrics.messages_received,
            attitude = metrics.attitude_readings,
            raw = metrics.raw_samples,
            dropped = metrics.messages_dropped,
            peak_queue = metrics.peak_queue_len,
            parse_errors = metrics.parse_errors,
            "Sensor transport closed"
        );

        let stats = outcome.map_err(CliError::from)?;
        if let Some(e) = tracker_failure {
            return Err(CliError::shutdown(format!("tracker: {e}")).into());
        }
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Pipeline shutdown complete"
        );
        Ok(stats)
    }
}
