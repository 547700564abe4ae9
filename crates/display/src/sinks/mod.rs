//! Display implementations

mod channel;
mod log;
mod png;

pub use self::channel::ChannelDisplay;
pub use self::log::LogDisplay;
pub use self::png::{FrameMeta, PngDisplay};

#[cfg(test)]
pub(crate) mod test_support {
    use contracts::{DisplayOutput, DisplaySurface, EyeBuffer, EyeSide, TrackingStatus};

    pub fn side_by_side(frame_id: u64, width: u32, height: u32) -> DisplayOutput {
        DisplayOutput {
            frame_id,
            frame_timestamp: frame_id as f64 * 0.016,
            orientation_timestamp: frame_id as f64 * 0.016,
            tracking: TrackingStatus::Live,
            surface: DisplaySurface::SideBySide {
                width,
                height,
                data: vec![200; width as usize * height as usize * 4],
            },
        }
    }

    pub fn dual(frame_id: u64) -> DisplayOutput {
        DisplayOutput {
            frame_id,
            frame_timestamp: 0.0,
            orientation_timestamp: 0.0,
            tracking: TrackingStatus::Stale { age_s: 0.4 },
            surface: DisplaySurface::Dual {
                left: EyeBuffer::new(EyeSide::Left, 4, 4),
                right: EyeBuffer::new(EyeSide::Right, 4, 4),
            },
        }
    }
}
