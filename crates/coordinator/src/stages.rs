//! The three stage loops

use std::mem::{discriminant, Discriminant};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    ContractError, DisplayLayout, DisplayOutput, DisplaySink, EyeParameters, FrameSource,
    OrientationEstimate, PipelineFrame, SessionClock, TrackingStatus,
};
use observability::{
    record_display_write, record_frame_captured, record_frame_presented, record_projection_ms,
    record_queue_depth, record_tracking_status, FrameMetricsAggregator, FrameRecord,
};
use parking_lot::{Mutex, RwLock};
use stereo::{compose, StereoProjector};
use tracing::{debug, error, info, instrument, trace, warn};
use tracking::OrientationReader;

use crate::control::{Control, RunSignal};
use crate::queue::{PopOutcome, PushOutcome, QueueConsumer, QueueProducer};
use crate::state::{StageBoard, StageId, StageState};
use crate::stats::{DropReason, PipelineCounters};

/// Consecutive capture failures between two warnings
const CAPTURE_WARN_EVERY: u64 = 100;

/// Shared handles every stage gets
#[derive(Clone)]
pub(crate) struct StageContext {
    pub control: Arc<Control>,
    pub board: Arc<StageBoard>,
    pub counters: Arc<PipelineCounters>,
    pub clock: SessionClock,
    pub stage_timeout: Duration,
}

impl StageContext {
    fn note_draining(&self, stage: StageId) {
        if self.control.current() == RunSignal::Drain
            && self.board.advance(stage, StageState::Draining)
        {
            debug!(stage = stage.as_str(), "Stage draining");
        }
    }
}

#[instrument(name = "capture_stage", skip_all, fields(source = %source.name()))]
pub(crate) async fn capture_stage<S: FrameSource>(
    ctx: StageContext,
    mut source: S,
    out: QueueProducer<PipelineFrame>,
) {
    let mut signal = ctx.control.subscribe();
    ctx.board.advance(StageId::Capture, StageState::Running);
    info!("Capture stage started");

    let mut failures: u64 = 0;
    loop {
        if *signal.borrow_and_update() != RunSignal::Run {
            break;
        }

        let result = tokio::select! {
            biased;
            _ = signal.changed() => continue,
            result = source.next_frame() => result,
        };

        match result {
            Ok(frame) => {
                failures = 0;
                ctx.counters.inc_captured();
                record_frame_captured(frame.frame_id);
                trace!(frame_id = frame.frame_id, "Frame captured");

                match out.push(PipelineFrame::new(frame)) {
                    PushOutcome::Enqueued => {}
                    PushOutcome::Evicted(n) => {
                        ctx.counters.record_drop(DropReason::CaptureOverflow, n as u64);
                        trace!(evicted = n, "Capture queue full, oldest frame dropped");
                    }
                    PushOutcome::Closed => break,
                }
                record_queue_depth(out.name(), out.len());
            }
            Err(e) if e.is_fatal() => {
                ctx.control.fail(e);
                break;
            }
            Err(e) => {
                ctx.counters.inc_capture_error();
                failures += 1;
                if failures == 1 || failures.is_multiple_of(CAPTURE_WARN_EVERY) {
                    warn!(error = %e, consecutive = failures, "Capture failed, retrying");
                } else {
                    debug!(error = %e, consecutive = failures, "Capture failed, retrying");
                }

                // A source failing instantly must not starve the runtime
                tokio::select! {
                    biased;
                    _ = signal.changed() => {}
                    _ = tokio::time::sleep(ctx.stage_timeout) => {}
                }
            }
        }
    }

    ctx.board.advance(StageId::Capture, StageState::Draining);
    out.close();
    if let Err(e) = source.close().await {
        warn!(error = %e, "Capture source close failed");
    }
    ctx.board.advance(StageId::Capture, StageState::Stopped);
    info!("Capture stage stopped");
}

/// Everything the process stage reads besides its queues
pub(crate) struct ProcessInputs {
    pub reader: OrientationReader,
    pub projector: StereoProjector,
    pub params: Arc<RwLock<EyeParameters>>,
    pub staleness_threshold_s: f64,
}

#[instrument(name = "process_stage", skip_all)]
pub(crate) async fn process_stage(
    ctx: StageContext,
    input: QueueConsumer<PipelineFrame>,
    out: QueueProducer<PipelineFrame>,
    inputs: ProcessInputs,
) {
    ctx.board.advance(StageId::Process, StageState::Running);
    info!("Process stage started");

    let mut last_tracking: Option<Discriminant<TrackingStatus>> = None;

    loop {
        if ctx.control.is_aborted() {
            break;
        }
        if inputs.reader.is_lost() {
            ctx.control.fail(ContractError::sensor_lost(
                "tracker",
                "orientation stream ended",
            ));
            break;
        }
        ctx.note_draining(StageId::Process);

        let mut frame = match input.pop_timeout(ctx.stage_timeout).await {
            PopOutcome::Item(frame) => frame,
            PopOutcome::TimedOut => continue,
            PopOutcome::Closed => break,
        };
        if ctx.control.is_aborted() {
            break;
        }

        let (orientation, tracking) =
            select_orientation(&inputs.reader, ctx.clock.now(), frame.timestamp(), inputs.staleness_threshold_s);
        report_tracking(&mut last_tracking, &tracking);
        match tracking {
            TrackingStatus::Live => {}
            TrackingStatus::Stale { .. } => ctx.counters.inc_stale(),
            TrackingStatus::Lost => ctx.counters.inc_lost(),
        }

        let params = *inputs.params.read();
        let projector = inputs.projector.clone();
        let captured = frame.captured.clone();
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            projector.project_stereo(&captured, &orientation, &params, tracking)
        })
        .await;
        record_projection_ms(started.elapsed().as_secs_f64() * 1000.0);

        let stereo = match result {
            Ok(Ok(stereo)) => stereo,
            Ok(Err(e)) => {
                let e = ContractError::from(e);
                warn!(frame_id = frame.frame_id(), error = %e, "Projection failed, frame dropped");
                ctx.counters.record_drop(DropReason::Transient, 1);
                continue;
            }
            Err(e) => {
                error!(frame_id = frame.frame_id(), error = %e, "Projection task failed");
                ctx.counters.record_drop(DropReason::Transient, 1);
                continue;
            }
        };

        frame.orientation = Some(orientation);
        frame.eyes = Some(stereo);
        frame.timings.processed_at = Some(ctx.clock.now());
        ctx.counters.inc_processed();

        match out.push(frame) {
            PushOutcome::Enqueued => {}
            PushOutcome::Evicted(n) => {
                ctx.counters.record_drop(DropReason::ProcessOverflow, n as u64);
                trace!(evicted = n, "Display queue full, oldest frame dropped");
            }
            PushOutcome::Closed => break,
        }
        record_queue_depth(out.name(), out.len());
    }

    ctx.board.advance(StageId::Process, StageState::Draining);
    out.close();
    ctx.board.advance(StageId::Process, StageState::Stopped);
    info!("Process stage stopped");
}

/// Latest estimate plus its tracking tag
///
/// Before the first estimate the head is assumed level.
pub(crate) fn select_orientation(
    reader: &OrientationReader,
    now: f64,
    frame_timestamp: f64,
    staleness_threshold_s: f64,
) -> (OrientationEstimate, TrackingStatus) {
    match reader.latest() {
        Some(estimate) => {
            let age = estimate.age(now);
            if age > staleness_threshold_s {
                (estimate, TrackingStatus::Stale { age_s: age })
            } else {
                (estimate, TrackingStatus::Live)
            }
        }
        None => (OrientationEstimate::level(frame_timestamp), TrackingStatus::Lost),
    }
}

fn report_tracking(last: &mut Option<Discriminant<TrackingStatus>>, tracking: &TrackingStatus) {
    record_tracking_status(tracking);

    let kind = discriminant(tracking);
    if *last == Some(kind) {
        return;
    }
    *last = Some(kind);
    match tracking {
        TrackingStatus::Live => info!("Tracking live"),
        TrackingStatus::Stale { age_s } => warn!(age_s = *age_s, "Orientation is stale"),
        TrackingStatus::Lost => warn!("No orientation yet, rendering level view"),
    }
}

#[instrument(name = "render_stage", skip_all, fields(display = %sink.name()))]
pub(crate) async fn render_stage<D: DisplaySink>(
    ctx: StageContext,
    input: QueueConsumer<PipelineFrame>,
    mut sink: D,
    layout: DisplayLayout,
    frame_metrics: Arc<Mutex<FrameMetricsAggregator>>,
) {
    ctx.board.advance(StageId::Render, StageState::Running);
    info!(?layout, "Render stage started");

    let mut last_delivered: Option<(u64, f64)> = None;

    loop {
        if ctx.control.is_aborted() {
            break;
        }
        ctx.note_draining(StageId::Render);

        let frame = match input.pop_timeout(ctx.stage_timeout).await {
            PopOutcome::Item(frame) => frame,
            PopOutcome::TimedOut => continue,
            PopOutcome::Closed => break,
        };
        if ctx.control.is_aborted() {
            break;
        }

        let frame_id = frame.frame_id();
        let frame_timestamp = frame.timestamp();
        if let Some((last_id, last_ts)) = last_delivered {
            if frame_id <= last_id || frame_timestamp < last_ts {
                debug!(frame_id, last_id, "Frame older than last presented, dropped");
                ctx.counters.record_drop(DropReason::Regression, 1);
                continue;
            }
        }

        let Some(eyes) = frame.eyes else {
            warn!(frame_id, "Frame reached render without eye buffers");
            ctx.counters.record_drop(DropReason::Transient, 1);
            continue;
        };
        let tracking = eyes.tracking;
        let orientation_timestamp = frame
            .orientation
            .map(|o| o.timestamp)
            .unwrap_or(frame_timestamp);

        let output = DisplayOutput {
            frame_id,
            frame_timestamp,
            orientation_timestamp,
            tracking,
            surface: compose(eyes, layout),
        };

        match sink.present(&output).await {
            Ok(()) => {
                last_delivered = Some((frame_id, frame_timestamp));
                ctx.counters.inc_presented();

                let now = ctx.clock.now();
                let record = FrameRecord {
                    latency_ms: (now - frame.timings.captured_at).max(0.0) * 1000.0,
                    orientation_age_ms: (!matches!(tracking, TrackingStatus::Lost))
                        .then(|| (now - orientation_timestamp).max(0.0) * 1000.0),
                    tracking,
                };
                record_display_write(sink.name(), true);
                record_frame_presented(sink.name(), &record);
                frame_metrics.lock().update(&record);
                trace!(frame_id, latency_ms = record.latency_ms, "Frame presented");
            }
            Err(e) if e.is_fatal() => {
                ctx.control.fail(e);
                break;
            }
            Err(e) => {
                warn!(frame_id, error = %e, "Display write failed, frame dropped");
                record_display_write(sink.name(), false);
                ctx.counters.record_drop(DropReason::Transient, 1);
            }
        }
    }

    ctx.board.advance(StageId::Render, StageState::Draining);
    if !ctx.control.is_aborted() {
        if let Err(e) = sink.flush().await {
            warn!(error = %e, "Display flush failed");
        }
    }
    if let Err(e) = sink.close().await {
        warn!(error = %e, "Display close failed");
    }
    ctx.board.advance(StageId::Render, StageState::Stopped);
    info!("Render stage stopped");
}
