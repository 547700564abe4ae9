//! Coordinator builder and the handle of a running pipeline

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    ContractError, DisplayLayout, DisplaySink, EyeParameters, FrameSource, PipelineSettings,
    SessionClock,
};
use observability::FrameMetricsAggregator;
use parking_lot::{Mutex, RwLock};
use stereo::{CacheStats, DistortionCache, StereoProjector};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracking::OrientationReader;

use crate::control::Control;
use crate::error::PipelineError;
use crate::queue::frame_queue;
use crate::stages::{capture_stage, process_stage, render_stage, ProcessInputs, StageContext};
use crate::state::{StageBoard, StageId, StageState};
use crate::stats::{PipelineCounters, PipelineStats};

pub(crate) const CAPTURE_QUEUE: &str = "capture_to_process";
pub(crate) const DISPLAY_QUEUE: &str = "process_to_render";

/// What the coordinator needs from the rig configuration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoordinatorConfig {
    pub settings: PipelineSettings,
    pub eye: EyeParameters,
    pub layout: DisplayLayout,
}

/// Pipeline builder
///
/// Owns the capture source and the display until [`Coordinator::spawn`] hands
/// them to their stage tasks.
pub struct Coordinator<S, D> {
    config: CoordinatorConfig,
    source: S,
    display: D,
    reader: OrientationReader,
    clock: SessionClock,
    cache: Arc<DistortionCache>,
}

impl<S, D> Coordinator<S, D>
where
    S: FrameSource + 'static,
    D: DisplaySink + 'static,
{
    pub fn new(
        config: CoordinatorConfig,
        source: S,
        display: D,
        reader: OrientationReader,
        clock: SessionClock,
    ) -> Self {
        Self {
            config,
            source,
            display,
            reader,
            clock,
            cache: Arc::new(DistortionCache::new()),
        }
    }

    /// Share an existing distortion cache
    pub fn with_cache(mut self, cache: Arc<DistortionCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Start the three stage tasks
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(self) -> Result<PipelineHandle, ContractError> {
        self.config.settings.check()?;
        self.config.eye.check()?;

        let settings = self.config.settings;
        let control = Arc::new(Control::new());
        let board = Arc::new(StageBoard::new());
        let counters = Arc::new(PipelineCounters::new());
        let params = Arc::new(RwLock::new(self.config.eye));
        let frame_metrics = Arc::new(Mutex::new(FrameMetricsAggregator::new()));

        let ctx = StageContext {
            control: Arc::clone(&control),
            board: Arc::clone(&board),
            counters: Arc::clone(&counters),
            clock: self.clock,
            stage_timeout: Duration::from_millis(settings.stage_timeout_ms),
        };

        let (capture_tx, capture_rx) = frame_queue(CAPTURE_QUEUE, settings.queue_capacity);
        let (display_tx, display_rx) = frame_queue(DISPLAY_QUEUE, settings.queue_capacity);

        info!(
            capture = self.source.name(),
            display = self.display.name(),
            queue_capacity = settings.queue_capacity,
            stage_timeout_ms = settings.stage_timeout_ms,
            eye = format_args!("{}x{}", self.config.eye.eye_width, self.config.eye.eye_height),
            layout = ?self.config.layout,
            "Starting pipeline"
        );

        let render = tokio::spawn(render_stage(
            ctx.clone(),
            display_rx,
            self.display,
            self.config.layout,
            Arc::clone(&frame_metrics),
        ));
        let process = tokio::spawn(process_stage(
            ctx.clone(),
            capture_rx,
            display_tx,
            ProcessInputs {
                reader: self.reader,
                projector: StereoProjector::new(Arc::clone(&self.cache)),
                params: Arc::clone(&params),
                staleness_threshold_s: settings.staleness_threshold_s,
            },
        ));
        let capture = tokio::spawn(capture_stage(ctx, self.source, capture_tx));

        Ok(PipelineHandle {
            control,
            board,
            counters,
            params,
            cache: self.cache,
            frame_metrics,
            started: Instant::now(),
            tasks: vec![
                (StageId::Capture, capture),
                (StageId::Process, process),
                (StageId::Render, render),
            ],
        })
    }
}

/// Control surface of a running pipeline
pub struct PipelineHandle {
    control: Arc<Control>,
    board: Arc<StageBoard>,
    counters: Arc<PipelineCounters>,
    params: Arc<RwLock<EyeParameters>>,
    cache: Arc<DistortionCache>,
    frame_metrics: Arc<Mutex<FrameMetricsAggregator>>,
    started: Instant,
    tasks: Vec<(StageId, JoinHandle<()>)>,
}

impl PipelineHandle {
    /// Aggregate state of the three stages
    pub fn state(&self) -> StageState {
        self.board.pipeline()
    }

    pub fn stage_state(&self, stage: StageId) -> StageState {
        self.board.get(stage)
    }

    /// Counters so far
    pub fn stats(&self) -> PipelineStats {
        let mut stats = self.counters.snapshot();
        stats.duration = self.started.elapsed();
        stats.frame_metrics = self.frame_metrics.lock().clone();
        stats.cache = self.cache.stats();
        stats
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Eye parameters currently used by the process stage
    pub fn eye_parameters(&self) -> EyeParameters {
        *self.params.read()
    }

    /// Swap the eye parameters between frames
    ///
    /// Invalid parameters are rejected and the running ones stay in place.
    pub fn reconfigure(&self, eye: EyeParameters) -> Result<(), ContractError> {
        eye.check()?;
        {
            let mut params = self.params.write();
            if *params == eye {
                return Ok(());
            }
            *params = eye;
        }
        self.cache.invalidate();
        info!(
            ipd_m = eye.ipd_m,
            fov_deg = eye.fov_deg,
            eye = format_args!("{}x{}", eye.eye_width, eye.eye_height),
            "Eye parameters reconfigured"
        );
        Ok(())
    }

    /// Ask the stages to finish in-flight frames and stop
    pub fn request_shutdown(&self) {
        self.control.drain();
    }

    /// Drain and wait for every stage to stop
    pub async fn shutdown(&mut self) -> Result<PipelineStats, PipelineError> {
        self.request_shutdown();
        self.wait().await
    }

    /// Wait until every stage has stopped
    ///
    /// A fatal error is reported by the first call only; later calls return the stats.
    pub async fn wait(&mut self) -> Result<PipelineStats, PipelineError> {
        let mut terminated = None;
        for (stage, task) in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(stage = stage.as_str(), error = %e, "Stage task ended abnormally");
                self.control.abort();
                self.board.advance(stage, StageState::Stopped);
                terminated.get_or_insert(PipelineError::StageTerminated {
                    stage: stage.as_str(),
                    message: e.to_string(),
                });
            }
        }

        if let Some(err) = terminated {
            return Err(err);
        }
        if let Some(err) = self.control.take_fatal() {
            warn!(error = %err, "Pipeline stopped on fatal error");
            return Err(PipelineError::Fatal(err));
        }

        let stats = self.stats();
        info!(
            presented = stats.frames_presented,
            dropped = stats.frames_dropped(),
            "Pipeline stopped"
        );
        Ok(stats)
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if self.tasks.iter().any(|(_, task)| !task.is_finished()) {
            self.control.drain();
        }
    }
}
