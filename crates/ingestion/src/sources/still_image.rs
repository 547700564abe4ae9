//! Still-image screen capture
//!
//! Decodes one image file and re-emits it at the configured frame rate, which
//! makes recorded screenshots usable as a desktop feed.

use std::path::Path;

use bytes::Bytes;
use contracts::{CapturedFrame, ContractError, FrameSource, PixelFormat, SessionClock};
use image::RgbaImage;
use tracing::{debug, info, trace};

use super::pacer::Pacer;
use crate::error::{IngestionError, Result};

const CURSOR_FILL: [u8; 4] = [255, 255, 255, 255];
const CURSOR_EDGE: [u8; 4] = [0, 0, 0, 255];

/// Draw a filled cursor dot with a one-pixel dark rim
pub fn draw_cursor(image: &mut RgbaImage, cx: u32, cy: u32, radius: u32) {
    let (w, h) = image.dimensions();
    let r = radius as i64;
    let inner = (r - 1).max(0);
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = dx * dx + dy * dy;
            if d2 > r * r {
                continue;
            }
            let x = cx as i64 + dx;
            let y = cy as i64 + dy;
            if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
                continue;
            }
            let color = if d2 > inner * inner { CURSOR_EDGE } else { CURSOR_FILL };
            image.put_pixel(x as u32, y as u32, image::Rgba(color));
        }
    }
}

/// Still-image capture source
#[derive(Debug)]
pub struct ImageFrameSource {
    name: String,
    width: u32,
    height: u32,
    pixels: Bytes,
    clock: SessionClock,
    pacer: Pacer,
    next_id: u64,
    closed: bool,
}

impl ImageFrameSource {
    /// Decode `path`, optionally stamping a cursor dot at the centre
    pub fn open(path: impl AsRef<Path>, fps: f64, cursor: bool, clock: SessionClock) -> Result<Self> {
        let path = path.as_ref();
        let mut image = image::open(path)
            .map_err(|source| IngestionError::ImageDecode {
                path: path.display().to_string(),
                source,
            })?
            .to_rgba8();

        let (width, height) = image.dimensions();
        if cursor {
            let radius = (width.min(height) / 100).max(3);
            draw_cursor(&mut image, width / 2, height / 2, radius);
        }

        info!(path = %path.display(), width, height, fps, "Loaded capture image");

        Ok(Self::from_rgba(image, fps, clock))
    }

    /// Wrap an already decoded image
    pub fn from_rgba(image: RgbaImage, fps: f64, clock: SessionClock) -> Self {
        let (width, height) = image.dimensions();
        Self {
            name: "image_capture".to_string(),
            width,
            height,
            pixels: Bytes::from(image.into_raw()),
            clock,
            pacer: Pacer::new(fps),
            next_id: 0,
            closed: false,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FrameSource for ImageFrameSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_frame(&mut self) -> std::result::Result<CapturedFrame, ContractError> {
        if self.closed {
            return Err(ContractError::capture_lost("capture source closed"));
        }

        self.pacer.tick().await;

        let frame = CapturedFrame {
            frame_id: self.next_id,
            timestamp: self.clock.now(),
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgba8,
            data: self.pixels.clone(),
        };
        self.next_id += 1;

        trace!(frame_id = frame.frame_id, "image frame captured");
        Ok(frame)
    }

    async fn close(&mut self) -> std::result::Result<(), ContractError> {
        if !self.closed {
            debug!(frames = self.next_id, "image capture closed");
            self.closed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_png_round_trip_through_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("desktop.png");
        RgbaImage::from_pixel(40, 20, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut source = ImageFrameSource::open(&path, 500.0, false, SessionClock::start()).unwrap();
        assert_eq!(source.dimensions(), (40, 20));

        let first = source.next_frame().await.unwrap();
        let second = source.next_frame().await.unwrap();
        assert!(first.validate().is_ok());
        assert_eq!(first.rgba_at(0, 0), [10, 20, 30, 255]);
        assert_eq!((first.frame_id, second.frame_id), (0, 1));
        assert_eq!(first.data, second.data);
    }

    #[test]
    fn test_cursor_dot_drawn_at_centre() {
        let mut image = RgbaImage::from_pixel(40, 40, image::Rgba([0, 0, 255, 255]));
        draw_cursor(&mut image, 20, 20, 4);
        assert_eq!(image.get_pixel(20, 20).0, CURSOR_FILL);
        assert_eq!(image.get_pixel(24, 20).0, CURSOR_EDGE);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_cursor_clipped_at_border() {
        let mut image = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 0]));
        draw_cursor(&mut image, 0, 0, 3);
        assert_eq!(image.get_pixel(0, 0).0, CURSOR_FILL);
    }

    #[test]
    fn test_missing_image_is_error() {
        let result = ImageFrameSource::open("/no/such/desktop.png", 30.0, true, SessionClock::start());
        assert!(matches!(result, Err(IngestionError::ImageDecode { .. })));
    }
}
