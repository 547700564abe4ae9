//! # Stereo
//!
//! Per-eye rendering of the captured desktop.
//!
//! - [`StereoProjector`]: head rotation + eye offset ray casting onto a virtual
//!   desktop plane, followed by lens pre-distortion
//! - [`DistortionCache`]: lazily built remap tables, one per eye and parameter set
//! - side-by-side / dual composition for the display

mod cache;
mod compose;
mod distortion;
mod geometry;
mod projector;
mod sampling;

pub use cache::{CacheStats, DistortionCache};
pub use compose::{compose, compose_side_by_side};
pub use distortion::{DistortionMap, RemapEntry};
pub use geometry::{focal_length_px, head_rotation, DesktopPlane};
pub use projector::{render_undistorted, ProjectionError, StereoProjector};
