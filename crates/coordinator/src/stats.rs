//! Pipeline statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use observability::{record_frame_dropped, FrameMetricsAggregator};
use stereo::CacheStats;

/// Reason a frame left the pipeline without being presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Evicted from the capture → process queue
    CaptureOverflow,
    /// Evicted from the process → display queue
    ProcessOverflow,
    /// Bad frame, projection failure or display write error
    Transient,
    /// Older than the last presented frame
    Regression,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CaptureOverflow => "capture_overflow",
            Self::ProcessOverflow => "process_overflow",
            Self::Transient => "transient",
            Self::Regression => "regression",
        }
    }
}

/// Live counters shared by the stages
#[derive(Debug, Default)]
pub struct PipelineCounters {
    captured: AtomicU64,
    processed: AtomicU64,
    presented: AtomicU64,
    dropped_capture_overflow: AtomicU64,
    dropped_process_overflow: AtomicU64,
    dropped_transient: AtomicU64,
    dropped_regression: AtomicU64,
    stale_frames: AtomicU64,
    lost_frames: AtomicU64,
    capture_errors: AtomicU64,
}

impl PipelineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_presented(&self) {
        self.presented.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stale(&self) {
        self.stale_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_lost(&self) {
        self.lost_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Failed `next_frame` call; no frame entered the pipeline
    pub fn inc_capture_error(&self) {
        self.capture_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count `n` dropped frames and export the metric
    pub fn record_drop(&self, reason: DropReason, n: u64) {
        let counter = match reason {
            DropReason::CaptureOverflow => &self.dropped_capture_overflow,
            DropReason::ProcessOverflow => &self.dropped_process_overflow,
            DropReason::Transient => &self.dropped_transient,
            DropReason::Regression => &self.dropped_regression,
        };
        counter.fetch_add(n, Ordering::Relaxed);
        for _ in 0..n {
            record_frame_dropped(reason.as_str());
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    pub fn dropped(&self, reason: DropReason) -> u64 {
        match reason {
            DropReason::CaptureOverflow => self.dropped_capture_overflow.load(Ordering::Relaxed),
            DropReason::ProcessOverflow => self.dropped_process_overflow.load(Ordering::Relaxed),
            DropReason::Transient => self.dropped_transient.load(Ordering::Relaxed),
            DropReason::Regression => self.dropped_regression.load(Ordering::Relaxed),
        }
    }

    /// Fill the counter fields of a stats report
    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_captured: self.captured.load(Ordering::Relaxed),
            frames_processed: self.processed.load(Ordering::Relaxed),
            frames_presented: self.presented.load(Ordering::Relaxed),
            dropped_capture_overflow: self.dropped(DropReason::CaptureOverflow),
            dropped_process_overflow: self.dropped(DropReason::ProcessOverflow),
            dropped_transient: self.dropped(DropReason::Transient),
            dropped_regression: self.dropped(DropReason::Regression),
            stale_frames: self.stale_frames.load(Ordering::Relaxed),
            lost_frames: self.lost_frames.load(Ordering::Relaxed),
            capture_errors: self.capture_errors.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Frames delivered by the capture source
    pub frames_captured: u64,

    /// Frames projected into an eye pair
    pub frames_processed: u64,

    /// Frames accepted by the display
    pub frames_presented: u64,

    pub dropped_capture_overflow: u64,
    pub dropped_process_overflow: u64,
    pub dropped_transient: u64,
    pub dropped_regression: u64,

    /// Frames rendered with a stale orientation
    pub stale_frames: u64,

    /// Frames rendered before any orientation arrived
    pub lost_frames: u64,

    /// Transient capture failures (not counted as captured or dropped)
    pub capture_errors: u64,

    /// Wall time since the pipeline started
    pub duration: Duration,

    /// Latency and tracking aggregates of presented frames
    pub frame_metrics: FrameMetricsAggregator,

    /// Distortion cache counters
    pub cache: CacheStats,
}

impl PipelineStats {
    /// Presented frames per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_presented as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Total frames dropped for any reason
    pub fn frames_dropped(&self) -> u64 {
        self.dropped_capture_overflow
            + self.dropped_process_overflow
            + self.dropped_transient
            + self.dropped_regression
    }

    /// Drop rate as a percentage of captured frames
    pub fn drop_rate(&self) -> f64 {
        if self.frames_captured > 0 {
            (self.frames_dropped() as f64 / self.frames_captured as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames captured: {}", self.frames_captured);
        println!("   ├─ Capture errors: {}", self.capture_errors);
        println!("   ├─ Frames processed: {}", self.frames_processed);
        println!("   ├─ Frames presented: {}", self.frames_presented);
        println!("   └─ FPS: {:.2}", self.fps());

        println!("\n🗑️  Dropped Frames ({:.2}%)", self.drop_rate());
        println!("   ├─ Capture queue overflow: {}", self.dropped_capture_overflow);
        println!("   ├─ Display queue overflow: {}", self.dropped_process_overflow);
        println!("   ├─ Transient errors: {}", self.dropped_transient);
        println!("   └─ Out of order: {}", self.dropped_regression);

        let summary = self.frame_metrics.summary();

        println!("\n📈 Tracking & Latency");
        println!(
            "   ├─ Stale tracking: {} ({:.2}%)",
            summary.stale_frames, summary.stale_rate
        );
        println!(
            "   ├─ Lost tracking: {} ({:.2}%)",
            summary.lost_frames, summary.lost_rate
        );
        println!("   ├─ Capture → present (ms): {}", summary.latency_ms);
        println!("   └─ Orientation → present (ms): {}", summary.orientation_age_ms);

        println!("\n🔍 Distortion Cache");
        println!("   ├─ Hits: {}", self.cache.hits);
        println!("   ├─ Builds: {}", self.cache.misses);
        println!("   └─ Invalidations: {}", self.cache.invalidations);

        println!();
    }
}
