//! 管线指标收集模块
//!
//! 通过 `metrics` facade 记录追踪与渲染指标，并提供内存聚合器用于运行摘要。

use contracts::{OrientationEstimate, TrackingStatus};
use metrics::{counter, gauge, histogram};

/// 记录一个 IMU 样本的处理结果
///
/// `outcome`: "accepted" / "non_positive_dt" / "gap" / "non_finite"
pub fn record_imu_sample(source_id: &str, outcome: &'static str) {
    counter!(
        "vr_desktop_imu_samples_total",
        "source" => source_id.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 记录当前姿态估计 (角度 -> 度)
pub fn record_orientation(estimate: &OrientationEstimate) {
    gauge!("vr_desktop_orientation_yaw_deg").set(estimate.yaw.to_degrees());
    gauge!("vr_desktop_orientation_pitch_deg").set(estimate.pitch.to_degrees());
    gauge!("vr_desktop_orientation_roll_deg").set(estimate.roll.to_degrees());
    gauge!("vr_desktop_orientation_variance").set(estimate.variance);
}

/// 记录捕获帧
pub fn record_frame_captured(frame_id: u64) {
    counter!("vr_desktop_frames_captured_total").increment(1);
    gauge!("vr_desktop_last_frame_id").set(frame_id as f64);
}

/// 记录丢帧及原因
///
/// `reason`: "capture_overflow" / "process_overflow" / "transient" / "regression"
pub fn record_frame_dropped(reason: &'static str) {
    counter!("vr_desktop_frames_dropped_total", "reason" => reason).increment(1);
}

/// 记录投影耗时
pub fn record_projection_ms(elapsed_ms: f64) {
    histogram!("vr_desktop_projection_ms").record(elapsed_ms);
}

/// 记录一次显示输出
pub fn record_frame_presented(sink_name: &str, record: &FrameRecord) {
    counter!(
        "vr_desktop_frames_presented_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
    histogram!("vr_desktop_motion_to_photon_ms").record(record.latency_ms);
    if let Some(age) = record.orientation_age_ms {
        histogram!("vr_desktop_orientation_age_ms").record(age);
    }
    record_tracking_status(&record.tracking);
}

/// 记录追踪状态 (0 = live, 1 = stale, 2 = lost)
pub fn record_tracking_status(status: &TrackingStatus) {
    let code = match status {
        TrackingStatus::Live => 0.0,
        TrackingStatus::Stale { .. } => 1.0,
        TrackingStatus::Lost => 2.0,
    };
    gauge!("vr_desktop_tracking_status").set(code);
}

/// 记录显示写入结果
pub fn record_display_write(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "vr_desktop_display_writes_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录畸变映射构建
pub fn record_distortion_build(side: &'static str, elapsed_ms: f64) {
    counter!("vr_desktop_distortion_builds_total", "side" => side).increment(1);
    histogram!("vr_desktop_distortion_build_ms").record(elapsed_ms);
}

/// 记录队列深度
pub fn record_queue_depth(queue: &'static str, depth: usize) {
    gauge!("vr_desktop_queue_depth", "queue" => queue).set(depth as f64);
}

/// 单帧显示记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRecord {
    /// 捕获 -> 显示 (毫秒)
    pub latency_ms: f64,
    /// 姿态时间戳 -> 显示 (毫秒)，无姿态时为 None
    pub orientation_age_ms: Option<f64>,
    pub tracking: TrackingStatus,
}

/// 帧指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FrameMetricsAggregator {
    /// 显示帧数
    pub total_frames: u64,

    /// 姿态过期的帧数
    pub stale_frames: u64,

    /// 无姿态的帧数
    pub lost_frames: u64,

    /// 捕获到显示延迟统计
    pub latency_stats: RunningStats,

    /// 姿态到显示延迟统计
    pub orientation_age_stats: RunningStats,
}

impl FrameMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, record: &FrameRecord) {
        self.total_frames += 1;
        match record.tracking {
            TrackingStatus::Live => {}
            TrackingStatus::Stale { .. } => self.stale_frames += 1,
            TrackingStatus::Lost => self.lost_frames += 1,
        }
        self.latency_stats.push(record.latency_ms);
        if let Some(age) = record.orientation_age_ms {
            self.orientation_age_stats.push(age);
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let pct = |n: u64| {
            if self.total_frames > 0 {
                n as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            }
        };
        MetricsSummary {
            total_frames: self.total_frames,
            stale_frames: self.stale_frames,
            lost_frames: self.lost_frames,
            stale_rate: pct(self.stale_frames),
            lost_rate: pct(self.lost_frames),
            latency_ms: StatsSummary::from(&self.latency_stats),
            orientation_age_ms: StatsSummary::from(&self.orientation_age_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub stale_frames: u64,
    pub lost_frames: u64,
    pub stale_rate: f64,
    pub lost_rate: f64,
    pub latency_ms: StatsSummary,
    pub orientation_age_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Frame Metrics Summary ===")?;
        writeln!(f, "Presented frames: {}", self.total_frames)?;
        writeln!(
            f,
            "Stale tracking: {} ({:.2}%)",
            self.stale_frames, self.stale_rate
        )?;
        writeln!(
            f,
            "Lost tracking: {} ({:.2}%)",
            self.lost_frames, self.lost_rate
        )?;
        writeln!(f, "Capture -> present (ms): {}", self.latency_ms)?;
        writeln!(f, "Orientation -> present (ms): {}", self.orientation_age_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = FrameMetricsAggregator::new();

        aggregator.update(&FrameRecord {
            latency_ms: 12.0,
            orientation_age_ms: Some(3.0),
            tracking: TrackingStatus::Live,
        });
        aggregator.update(&FrameRecord {
            latency_ms: 20.0,
            orientation_age_ms: Some(300.0),
            tracking: TrackingStatus::Stale { age_s: 0.3 },
        });
        aggregator.update(&FrameRecord {
            latency_ms: 16.0,
            orientation_age_ms: None,
            tracking: TrackingStatus::Lost,
        });

        assert_eq!(aggregator.total_frames, 3);
        assert_eq!(aggregator.stale_frames, 1);
        assert_eq!(aggregator.lost_frames, 1);
        assert_eq!(aggregator.latency_stats.count(), 3);
        assert_eq!(aggregator.orientation_age_stats.count(), 2);
        assert!((aggregator.latency_stats.mean() - 16.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = FrameMetricsAggregator::new();
        for _ in 0..19 {
            aggregator.update(&FrameRecord {
                latency_ms: 10.0,
                orientation_age_ms: Some(1.0),
                tracking: TrackingStatus::Live,
            });
        }
        aggregator.update(&FrameRecord {
            latency_ms: 10.0,
            orientation_age_ms: None,
            tracking: TrackingStatus::Lost,
        });

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Presented frames: 20"));
        assert!(output.contains("5.00%"));
    }
}
