//! # Tracking
//!
//! Head orientation tracking.
//!
//! Responsibilities:
//! - Complementary filter over raw accelerometer/gyroscope samples
//! - Smoothing of absolute attitude readings
//! - Publishing the latest estimate to any number of readers
//! - Short orientation history for interpolation
//!
//! ## Example
//!
//! ```ignore
//! use tracking::TrackerWorker;
//!
//! let (tx, rx) = async_channel::bounded(64);
//! let tracker = TrackerWorker::spawn("imu", config.filter, rx);
//! let reader = tracker.reader();
//!
//! // transport pushes ImuMessage into `tx` ...
//! if let Some(estimate) = reader.latest() {
//!     println!("yaw = {:.1}°", estimate.yaw.to_degrees());
//! }
//! ```

mod angles;
mod cell;
mod filter;
mod history;
mod worker;

pub use angles::{lerp_angle, tilt_from_gravity, wrap_angle};
pub use cell::{LatestOrientation, OrientationReader};
pub use filter::{FilterRejection, FilterStats, OrientationFilter};
pub use history::OrientationHistory;
pub use worker::{TrackerCommand, TrackerHandle, TrackerReport, TrackerWorker};

// Re-export contracts types
pub use contracts::{FilterConfig, ImuMessage, OrientationEstimate, RawImuSample};
