//! # Contracts
//!
//! Frozen interface contracts, defining inter-crate data structures and traits.
//! All business crates depend only on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every timestamp is session-clock seconds (f64), see [`SessionClock`]
//! - `frame_id` is a capture sequence number, used for ordering/diagnostics

mod clock;
mod display_sink;
mod error;
mod frame;
mod imu;
mod imu_source;
mod optics;
mod rig;

pub use clock::SessionClock;
pub use display_sink::*;
pub use error::*;
pub use frame::*;
pub use imu::*;
pub use imu_source::{ImuCallback, ImuSource};
pub use optics::*;
pub use rig::{
    CaptureConfig, CaptureKind, ConfigVersion, DisplayConfig, DisplayKind, DropPolicy,
    FilterConfig, MockPattern, MountOffset, PipelineSettings, RigConfig, SensorConfig, SensorKind,
};
