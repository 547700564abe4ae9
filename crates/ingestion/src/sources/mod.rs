//! Concrete sensor transports and capture sources, plus config-driven factories

mod line;
mod mock_frame;
mod mock_imu;
mod pacer;
mod still_image;

use std::sync::Arc;

use contracts::{
    CaptureConfig, CaptureKind, CapturedFrame, ContractError, FrameSource, ImuSource,
    SensorConfig, SensorKind, SessionClock,
};
use tracing::instrument;

pub use line::LineImuSource;
pub use mock_frame::{render_pattern, MockFrameSource};
pub use mock_imu::{synthetic_sample, MockImuConfig, MockImuSource, GRAVITY};
pub use still_image::{draw_cursor, ImageFrameSource};

use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};

/// Capture source selected by configuration
#[derive(Debug)]
pub enum CaptureSource {
    Mock(MockFrameSource),
    Image(ImageFrameSource),
}

impl FrameSource for CaptureSource {
    fn name(&self) -> &str {
        match self {
            Self::Mock(source) => source.name(),
            Self::Image(source) => source.name(),
        }
    }

    async fn next_frame(&mut self) -> std::result::Result<CapturedFrame, ContractError> {
        match self {
            Self::Mock(source) => source.next_frame().await,
            Self::Image(source) => source.next_frame().await,
        }
    }

    async fn close(&mut self) -> std::result::Result<(), ContractError> {
        match self {
            Self::Mock(source) => source.close().await,
            Self::Image(source) => source.close().await,
        }
    }
}

/// Build the capture source named by `config`
#[instrument(name = "ingestion_create_capture", skip(config, clock), fields(kind = ?config.kind))]
pub fn create_frame_source(config: &CaptureConfig, clock: SessionClock) -> Result<CaptureSource> {
    match config.kind {
        CaptureKind::Mock => Ok(CaptureSource::Mock(MockFrameSource::new(config, clock))),
        CaptureKind::Image => {
            let path = config
                .image_path
                .as_ref()
                .ok_or_else(|| IngestionError::misconfigured("capture", "image_path is required"))?;
            Ok(CaptureSource::Image(ImageFrameSource::open(
                path,
                config.fps,
                config.cursor,
                clock,
            )?))
        }
    }
}

/// Build the sensor transport named by `config`
#[instrument(
    name = "ingestion_create_imu_source",
    skip(config, clock, metrics),
    fields(kind = ?config.kind, source_id = %config.source_id)
)]
pub fn create_imu_source(
    config: &SensorConfig,
    clock: SessionClock,
    metrics: Arc<IngestionMetrics>,
) -> Result<Box<dyn ImuSource>> {
    match config.kind {
        SensorKind::Mock => Ok(Box::new(MockImuSource::new(
            config.source_id.clone(),
            MockImuConfig::from(config),
            clock,
        ))),
        SensorKind::Replay => {
            let path = config.replay_path.as_ref().ok_or_else(|| {
                IngestionError::misconfigured(config.source_id.clone(), "replay_path is required")
            })?;
            let source = LineImuSource::from_path(config.source_id.clone(), path, config.rate_hz, clock)?
                .looping(config.loop_replay)
                .with_metrics(metrics);
            Ok(Box::new(source))
        }
    }
}
