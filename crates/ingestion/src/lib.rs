//! # Ingestion
//!
//! Sensor transport and screen capture collaborators.
//!
//! Responsibilities:
//! - Bridge callback-based `ImuSource` transports into one bounded channel
//! - Backpressure with a drop policy (drop oldest by default)
//! - Parse the `Yaw: .., Pitch: .., Roll: ..` text protocol
//! - Mock and replay IMU transports, mock and still-image capture sources
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{create_imu_source, IngestionPipeline};
//!
//! let mut pipeline = IngestionPipeline::new(64);
//! let source = create_imu_source(&config.sensor, clock, pipeline.metrics())?;
//! pipeline.register_source(source, None)?;
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all()?;
//! while let Ok(message) = rx.recv().await {
//!     // feed the tracker
//! }
//! ```

mod adapter;
mod attitude;
mod channel;
mod config;
mod error;
mod pipeline;
pub mod sources;

// Re-exports
pub use adapter::SourceAdapter;
pub use attitude::parse_attitude_line;
pub use channel::MessageSender;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::ImuMessage;
pub use error::{IngestionError, Result};
pub use pipeline::IngestionPipeline;
pub use sources::{
    create_frame_source, create_imu_source, CaptureSource, ImageFrameSource, LineImuSource,
    MockFrameSource, MockImuConfig, MockImuSource,
};
