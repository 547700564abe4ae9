//! Tracker worker: transport channel -> filter -> latest-orientation cell.

use std::sync::Arc;

use contracts::{ContractError, FilterConfig, ImuMessage, OrientationEstimate};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::{
    FilterStats, LatestOrientation, OrientationFilter, OrientationHistory, OrientationReader,
};

/// Commands accepted while running
#[derive(Debug, Clone)]
pub enum TrackerCommand {
    /// Current heading becomes zero yaw
    Recenter,
    /// Swap filter tuning, keeping state
    Reconfigure(FilterConfig),
    /// Finish cleanly
    Stop,
}

/// Final counters of a tracker run
#[derive(Debug, Clone, Default)]
pub struct TrackerReport {
    pub stats: FilterStats,
    pub last: Option<OrientationEstimate>,
}

/// Handle to a running tracker worker
#[derive(Debug)]
pub struct TrackerHandle {
    commands: mpsc::Sender<TrackerCommand>,
    reader: OrientationReader,
    history: Arc<Mutex<OrientationHistory>>,
    task: JoinHandle<Result<TrackerReport, ContractError>>,
}

impl TrackerHandle {
    /// Reader for the latest-orientation cell
    pub fn reader(&self) -> OrientationReader {
        self.reader.clone()
    }

    /// Interpolated estimate at a session time, from the retained history
    pub fn estimate_at(&self, t: f64) -> Option<OrientationEstimate> {
        self.history.lock().estimate_at(t)
    }

    /// Fails if the worker has already exited
    pub async fn recenter(&self) -> Result<(), ContractError> {
        self.command(TrackerCommand::Recenter).await
    }

    pub async fn reconfigure(&self, config: FilterConfig) -> Result<(), ContractError> {
        config.check()?;
        self.command(TrackerCommand::Reconfigure(config)).await
    }

    async fn command(&self, command: TrackerCommand) -> Result<(), ContractError> {
        self.commands
            .send(command)
            .await
            .map_err(|e| ContractError::Other(format!("tracker not running, {:?} not applied", e.0)))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Ask the worker to stop and wait for its report
    pub async fn stop(self) -> Result<TrackerReport, ContractError> {
        // An exited worker reports its own outcome through join
        let _ = self.commands.send(TrackerCommand::Stop).await;
        self.join().await
    }

    /// Wait for the worker to end on its own
    pub async fn join(self) -> Result<TrackerReport, ContractError> {
        self.task
            .await
            .map_err(|e| ContractError::Other(format!("tracker task failed: {e}")))?
    }
}

/// Tracker worker state
pub struct TrackerWorker {
    source_id: String,
    filter: OrientationFilter,
    cell: LatestOrientation,
    history: Arc<Mutex<OrientationHistory>>,
    input: async_channel::Receiver<ImuMessage>,
    commands: mpsc::Receiver<TrackerCommand>,
}

impl TrackerWorker {
    /// Spawn the worker on the current runtime
    ///
    /// The latest-orientation cell is created here and dropped when the worker ends.
    pub fn spawn(
        source_id: impl Into<String>,
        config: FilterConfig,
        input: async_channel::Receiver<ImuMessage>,
    ) -> TrackerHandle {
        let (cell, reader) = LatestOrientation::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let history = Arc::new(Mutex::new(OrientationHistory::new(config.history_capacity)));

        let worker = TrackerWorker {
            source_id: source_id.into(),
            filter: OrientationFilter::new(config),
            cell,
            history: Arc::clone(&history),
            input,
            commands: cmd_rx,
        };

        let task = tokio::spawn(worker.run());

        TrackerHandle {
            commands: cmd_tx,
            reader,
            history,
            task,
        }
    }

    #[instrument(name = "tracker_worker", skip(self), fields(source = %self.source_id))]
    async fn run(mut self) -> Result<TrackerReport, ContractError> {
        info!("tracker started");
        let mut commands_open = true;

        let result = loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv(), if commands_open => match cmd {
                    Some(TrackerCommand::Stop) => break Ok(()),
                    Some(cmd) => self.apply(cmd),
                    None => commands_open = false,
                },

                msg = self.input.recv() => match msg {
                    Ok(ImuMessage::Disconnected(reason)) => {
                        break Err(ContractError::sensor_lost(&self.source_id, reason));
                    }
                    Ok(msg) => self.handle(msg),
                    Err(_) => {
                        break Err(ContractError::sensor_lost(
                            &self.source_id,
                            "transport channel closed",
                        ));
                    }
                },
            }
        };

        let report = TrackerReport {
            stats: self.filter.stats(),
            last: self.filter.current(),
        };

        match result {
            Ok(()) => {
                info!(
                    accepted = report.stats.accepted,
                    rejected = report.stats.rejected(),
                    "tracker stopped"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, accepted = report.stats.accepted, "tracker lost its sensor");
                Err(e)
            }
        }
    }

    fn handle(&mut self, msg: ImuMessage) {
        let result = match &msg {
            ImuMessage::Sample(sample) => self.filter.update(sample),
            ImuMessage::Attitude(reading) => self.filter.update_attitude(reading),
            ImuMessage::Disconnected(_) => return,
        };

        match result {
            Ok(estimate) => {
                observability::record_imu_sample(&self.source_id, "accepted");
                observability::record_orientation(&estimate);
                self.history.lock().push(estimate);
                self.cell.publish(estimate);
            }
            Err(rejection) => {
                observability::record_imu_sample(&self.source_id, rejection.label());
                debug!(
                    timestamp = ?msg.timestamp(),
                    reason = %rejection,
                    "sample rejected"
                );
            }
        }
    }

    fn apply(&mut self, cmd: TrackerCommand) {
        match cmd {
            TrackerCommand::Recenter => {
                if self.filter.recenter() {
                    // Published value must reflect the new reference right away
                    if let Some(estimate) = self.filter.current() {
                        self.history.lock().clear();
                        self.history.lock().push(estimate);
                        self.cell.publish(estimate);
                    }
                    info!("orientation recentered");
                } else {
                    debug!("recenter ignored, no estimate yet");
                }
            }
            TrackerCommand::Reconfigure(config) => {
                info!(alpha = config.alpha, max_dt_s = config.max_dt_s, "filter reconfigured");
                self.filter.reconfigure(config);
            }
            TrackerCommand::Stop => {}
        }
    }
}
